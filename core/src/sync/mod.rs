//! Keeps execution snapshots fresh without a network round trip per read.

pub mod cache;
pub mod controller;
pub mod fetcher;
pub mod metrics;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::CacheConfig;
pub use cache::ExecutionCache;
pub use controller::ControllerSnapshot;
pub use controller::ExecutionController;
pub use controller::LoadPhase;
pub use controller::PollingConfig;
pub use controller::SyncError;
pub use fetcher::StateFetcher;
pub use metrics::CacheStats;
