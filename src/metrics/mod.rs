//! Request outcomes and the shared run statistics.
mod aggregator;
mod types;


pub use aggregator::StatsAggregator;
pub use types::{MAX_BODY_CHARS, RequestOutcome, StatsSnapshot, truncate_chars};
