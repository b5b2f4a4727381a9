use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RequestOutcome, StatsSnapshot};

/// Run statistics shared by every worker of a run.
///
/// All fields sit behind one mutex so `record` and `snapshot` are atomic with
/// respect to each other: a snapshot always satisfies
/// `total_requests == success + failure`. The critical section never awaits.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    state: Mutex<StatsSnapshot>,
}

impl StatsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one outcome into the totals and replaces the last-response slot.
    pub fn record(&self, outcome: RequestOutcome) {
        let mut state = self.lock();
        state.total_requests = state.total_requests.saturating_add(1);
        if outcome.is_success() {
            state.success = state.success.saturating_add(1);
        } else {
            state.failure = state.failure.saturating_add(1);
        }
        state.total_latency = state.total_latency.saturating_add(outcome.latency);
        state.last_response = Some(outcome);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().clone()
    }

    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.lock().total_requests
    }

    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
