use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::ConfigError;
use crate::http::Rate;

/// Longest run a single config may request (one year).
pub const MAX_RUN_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Most workers a single config may request.
pub const MAX_CONCURRENCY: usize = 10_000;

/// Validated, immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    target: Url,
    concurrency: NonZeroUsize,
    duration: Duration,
    rps: Rate,
}

impl RunConfig {
    /// Validates raw run parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when the target is not an absolute http(s) URL with a
    /// host, when concurrency is zero or above [`MAX_CONCURRENCY`], or when the duration is zero or longer
    /// than [`MAX_RUN_DURATION`].
    pub fn new(
        target: &str,
        concurrency: usize,
        duration: Duration,
        rps: Rate,
    ) -> Result<Self, ConfigError> {
        let target = parse_target(target)?;
        let concurrency = NonZeroUsize::new(concurrency).ok_or(ConfigError::ConcurrencyZero)?;
        if concurrency.get() > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyTooHigh {
                max: MAX_CONCURRENCY,
            });
        }
        if duration.is_zero() {
            return Err(ConfigError::DurationZero);
        }
        if duration > MAX_RUN_DURATION {
            return Err(ConfigError::DurationTooLong {
                max_secs: MAX_RUN_DURATION.as_secs(),
            });
        }
        Ok(Self {
            target,
            concurrency,
            duration,
            rps,
        })
    }

    #[must_use]
    pub const fn target(&self) -> &Url {
        &self.target
    }

    #[must_use]
    pub const fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub const fn rps(&self) -> Rate {
        self.rps
    }

    #[must_use]
    pub fn summary(&self) -> RunConfigSummary {
        RunConfigSummary {
            target: self.target.to_string(),
            concurrency: self.concurrency.get(),
            duration_secs: self.duration.as_secs_f64(),
            rps: self.rps.as_rps(),
        }
    }
}

/// Serialisable view of a `RunConfig` for reports and status responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfigSummary {
    pub target: String,
    pub concurrency: usize,
    pub duration_secs: f64,
    pub rps: f64,
}

fn parse_target(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingTarget);
    }
    let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidTarget {
        url: trimmed.to_owned(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(ConfigError::UnsupportedScheme {
                url: trimmed.to_owned(),
            });
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::MissingHost {
            url: trimmed.to_owned(),
        });
    }
    Ok(url)
}
