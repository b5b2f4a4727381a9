use std::fmt::Display;
use std::time::Duration;

/// Longest body snippet kept for a single outcome, in characters.
pub const MAX_BODY_CHARS: usize = 2_000;

/// Classified result of one request attempt.
///
/// `status` is `None` when the request never produced a response (connect
/// failure, timeout, protocol error). Such outcomes always count as failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: Option<u16>,
    pub latency: Duration,
    pub body: String,
}

impl RequestOutcome {
    /// Builds an outcome for a request that produced a response.
    #[must_use]
    pub fn completed(status: u16, latency: Duration, body: &str) -> Self {
        Self {
            status: Some(status),
            latency,
            body: truncate_chars(body, MAX_BODY_CHARS),
        }
    }

    /// Builds an outcome for a request that failed before a response arrived.
    #[must_use]
    pub fn transport_failure(latency: Duration, error: impl Display) -> Self {
        let body = format!("exception: {}", error);
        Self {
            status: None,
            latency,
            body: truncate_chars(&body, MAX_BODY_CHARS),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

/// Point-in-time view of a run's statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub success: u64,
    pub failure: u64,
    pub total_latency: Duration,
    pub last_response: Option<RequestOutcome>,
}

impl StatsSnapshot {
    /// Mean latency over every recorded request, or `None` before the first one.
    #[must_use]
    pub fn average_latency(&self) -> Option<Duration> {
        let avg_nanos = self
            .total_latency
            .as_nanos()
            .checked_div(u128::from(self.total_requests))?;
        Some(Duration::from_nanos(
            u64::try_from(avg_nanos).unwrap_or(u64::MAX),
        ))
    }
}

/// Truncates `text` to at most `max_chars` characters without splitting a
/// code point.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text.get(..byte_idx).unwrap_or(text).to_owned(),
        None => text.to_owned(),
    }
}
