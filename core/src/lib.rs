//! Execution-state synchronization engine for outbound campaign tooling.
//!
//! [`sync`] keeps a per-campaign execution snapshot fresh (TTL cache,
//! single-flight fetches, status-driven polling); [`classify`] turns the raw
//! backend fields consumers display into governance, confidence, provenance
//! and readiness levels.

pub mod classify;
pub mod config;
pub mod summary;
pub mod sync;

pub use config::ConfigError;
pub use config::SyncConfig;
pub use summary::ExecutionSummary;
