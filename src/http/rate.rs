use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::ConfigError;

/// Fixed-point units that make up one token (and one request per second).
const UNITS_PER_TOKEN: u64 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
/// Seconds of refill the bucket may hold as burst.
const BURST_SECS: u64 = 2;
/// Largest accepted rate, in requests per second.
const MAX_RPS: f64 = 1_000_000_000.0;

/// Shortest sleep between refill attempts.
pub const MIN_WAIT: Duration = Duration::from_millis(10);

/// Target request rate stored in millionths of a request per second.
///
/// A zero rate means "unlimited".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate {
    micros_per_sec: u64,
}

impl Rate {
    pub const UNLIMITED: Rate = Rate { micros_per_sec: 0 };

    /// Converts a requests-per-second value into a `Rate`.
    ///
    /// # Errors
    ///
    /// Returns an error for negative, non-finite, or absurdly large rates, and for
    /// positive rates below one millionth of a request per second.
    #[expect(
        clippy::float_arithmetic,
        reason = "Single boundary conversion into fixed-point units"
    )]
    pub fn from_rps(rps: f64) -> Result<Self, ConfigError> {
        if !rps.is_finite() {
            return Err(ConfigError::NonFiniteRps);
        }
        if rps < 0.0 {
            return Err(ConfigError::NegativeRps);
        }
        if rps > MAX_RPS {
            return Err(ConfigError::RpsOverflow);
        }
        let micros_per_sec = (rps * 1_000_000.0).round() as u64;
        if micros_per_sec == 0 && rps > 0.0 {
            return Err(ConfigError::RpsTooSmall);
        }
        Ok(Self { micros_per_sec })
    }

    #[must_use]
    pub const fn from_micros_per_sec(micros_per_sec: u64) -> Self {
        Self { micros_per_sec }
    }

    #[must_use]
    pub const fn micros_per_sec(self) -> u64 {
        self.micros_per_sec
    }

    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        self.micros_per_sec == 0
    }

    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "Reporting-only conversion back to requests per second"
    )]
    pub fn as_rps(self) -> f64 {
        self.micros_per_sec as f64 / 1_000_000.0
    }

    /// Bucket capacity in units: two seconds of refill, never below one token.
    const fn capacity_units(self) -> u64 {
        let burst = self.micros_per_sec.saturating_mul(BURST_SECS);
        if burst < UNITS_PER_TOKEN {
            UNITS_PER_TOKEN
        } else {
            burst
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            return write!(f, "unlimited");
        }
        let whole = self.micros_per_sec.checked_div(UNITS_PER_TOKEN).unwrap_or(0);
        let frac = self.micros_per_sec.checked_rem(UNITS_PER_TOKEN).unwrap_or(0);
        if frac == 0 {
            return write!(f, "{}/s", whole);
        }
        let digits = format!("{:06}", frac);
        write!(f, "{}.{}/s", whole, digits.trim_end_matches('0'))
    }
}

#[derive(Debug)]
struct TokenBucket {
    units: u64,
    capacity: u64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant, rate: Rate) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let added = elapsed
            .as_nanos()
            .saturating_mul(u128::from(rate.micros_per_sec))
            .checked_div(NANOS_PER_SEC)
            .unwrap_or(0);
        let added = u64::try_from(added).unwrap_or(u64::MAX);
        self.units = self.units.saturating_add(added).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        if self.units < UNITS_PER_TOKEN {
            return false;
        }
        self.units = self.units.saturating_sub(UNITS_PER_TOKEN);
        true
    }

    /// Time until one whole token is available, floored at `MIN_WAIT`.
    fn wait_time(&self, rate: Rate) -> Duration {
        let missing = u128::from(UNITS_PER_TOKEN.saturating_sub(self.units));
        let per_sec = u128::from(rate.micros_per_sec.max(1));
        let nanos = missing
            .saturating_mul(NANOS_PER_SEC)
            .saturating_add(per_sec.saturating_sub(1))
            .checked_div(per_sec)
            .unwrap_or(0);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)).max(MIN_WAIT)
    }
}

/// Token-bucket gate shared by every worker of a run.
///
/// Refill, check and consume happen under one lock, so concurrent acquirers
/// can never spend more tokens than the bucket accrued. The bucket starts
/// empty and holds at most two seconds of refill. A zero rate disables it.
#[derive(Debug)]
pub struct RateLimiter {
    rate: Rate,
    bucket: Option<Mutex<TokenBucket>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(rate: Rate) -> Self {
        Self::starting_at(rate, Instant::now())
    }

    #[must_use]
    pub fn starting_at(rate: Rate, start: Instant) -> Self {
        let bucket = (!rate.is_unlimited()).then(|| {
            Mutex::new(TokenBucket {
                units: 0,
                capacity: rate.capacity_units(),
                last_refill: start,
            })
        });
        Self { rate, bucket }
    }

    #[must_use]
    pub const fn rate(&self) -> Rate {
        self.rate
    }

    /// Burst capacity in whole tokens, `None` when unlimited.
    #[must_use]
    pub fn burst_capacity(&self) -> Option<u64> {
        self.bucket.as_ref().map(|bucket| {
            lock_bucket(bucket)
                .capacity
                .checked_div(UNITS_PER_TOKEN)
                .unwrap_or(0)
        })
    }

    /// Suspends until a token is available and consumes it.
    pub async fn acquire(&self) {
        let Some(bucket) = self.bucket.as_ref() else {
            return;
        };
        loop {
            let wait = {
                let mut bucket = lock_bucket(bucket);
                bucket.refill(Instant::now(), self.rate);
                if bucket.try_consume() {
                    return;
                }
                bucket.wait_time(self.rate)
            };
            sleep(wait).await;
        }
    }

    /// Consumes a token if one is available right now.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.bucket.as_ref().is_none_or(|bucket| {
            let mut bucket = lock_bucket(bucket);
            bucket.refill(Instant::now(), self.rate);
            bucket.try_consume()
        })
    }
}

fn lock_bucket(bucket: &Mutex<TokenBucket>) -> MutexGuard<'_, TokenBucket> {
    bucket.lock().unwrap_or_else(PoisonError::into_inner)
}
