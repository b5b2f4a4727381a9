pub const DEFAULT_USER_AGENT: &str = concat!("pacer/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_CONCURRENCY: &str = "10";
pub const DEFAULT_DURATION: &str = "10s";
/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: &str = "10s";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
