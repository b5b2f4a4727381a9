//! Request pacing and execution.
mod client;
mod executor;
mod query;
mod rate;


pub use client::build_client;
pub use executor::{HttpExecutor, RequestExecutor, decode_body};
pub use query::{DEFAULT_QUERY_PATTERN, QueryGenerator, QueryParams};
pub use rate::{MIN_WAIT, Rate, RateLimiter};
