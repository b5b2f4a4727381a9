use super::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Config '{field}' is invalid: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: ValidationError,
    },
    #[error("Missing target URL (set --target or provide it in config).")]
    MissingTarget,
    #[error("Invalid target URL '{url}': {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Target URL '{url}' must use http or https.")]
    UnsupportedScheme { url: String },
    #[error("Target URL '{url}' is missing a host.")]
    MissingHost { url: String },
    #[error("Concurrency must be >= 1.")]
    ConcurrencyZero,
    #[error("Concurrency must be at most {max}.")]
    ConcurrencyTooHigh { max: usize },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Duration must be at most {max_secs}s.")]
    DurationTooLong { max_secs: u64 },
    #[error("Rate must be >= 0 requests per second.")]
    NegativeRps,
    #[error("Rate must be a finite number.")]
    NonFiniteRps,
    #[error("Rate must be 0 (unlimited) or at least 0.000001 requests per second.")]
    RpsTooSmall,
    #[error("Rate is too large.")]
    RpsOverflow,
}
