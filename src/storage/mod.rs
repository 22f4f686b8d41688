//! Storage for the summary cache and its history snapshots.

pub mod summary;

// Re-export for convenience
pub use summary::{SummaryStore, collect_garbage, merge};
