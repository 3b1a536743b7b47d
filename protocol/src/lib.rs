//! Data model shared between the execution-state fetcher and the sync engine.

mod execution;

pub use execution::ContactCounts;
pub use execution::ExecutionFunnel;
pub use execution::ExecutionRun;
pub use execution::ExecutionState;
pub use execution::LeadCounts;
pub use execution::OrganizationCounts;
pub use execution::OutcomeType;
pub use execution::RunStatus;
pub use execution::StateMeta;
pub use execution::StateOrigin;
