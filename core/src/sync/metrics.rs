use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Requests actually sent to the fetcher.
    pub network_fetches: u64,
    /// Reads that attached to a fetch already in flight.
    pub joined_in_flight: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 1.0;
        }
        self.hits as f32 / total as f32
    }
}
