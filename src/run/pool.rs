use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::http::{QueryGenerator, RateLimiter, RequestExecutor};
use crate::metrics::StatsAggregator;

use super::{RunConfig, StopSignal};

/// Shared collaborators every worker of one run reads from or writes into.
#[derive(Clone)]
pub struct WorkerDeps {
    pub executor: Arc<dyn RequestExecutor>,
    pub queries: Arc<QueryGenerator>,
    pub limiter: Arc<RateLimiter>,
    pub stats: Arc<StatsAggregator>,
}

/// Runs `config.concurrency()` worker loops until `deadline` or stop.
///
/// Returns once every worker has exited. An in-flight request is allowed to
/// finish; no new request starts after the deadline passes or stop is seen.
pub async fn run_worker_pool(
    config: &RunConfig,
    deps: &WorkerDeps,
    deadline: Instant,
    stop: &StopSignal,
) {
    let mut workers = JoinSet::new();
    for worker_id in 0..config.concurrency().get() {
        let deps = deps.clone();
        let target = config.target().clone();
        let stop = stop.clone();
        workers.spawn(async move {
            run_worker(worker_id, &target, &deps, deadline, stop).await;
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            warn!("Worker task failed: {}", err);
        }
    }
}

async fn run_worker(
    worker_id: usize,
    target: &url::Url,
    deps: &WorkerDeps,
    deadline: Instant,
    mut stop: StopSignal,
) {
    let mut issued: u64 = 0;
    loop {
        if stop.is_stopped() || Instant::now() >= deadline {
            break;
        }
        tokio::select! {
            biased;
            () = stop.stopped() => break,
            () = sleep_until(deadline) => break,
            () = deps.limiter.acquire() => {}
        }
        if stop.is_stopped() || Instant::now() >= deadline {
            break;
        }

        let params = deps.queries.generate();
        let outcome = deps.executor.execute(target, &params).await;
        deps.stats.record(outcome);
        issued = issued.saturating_add(1);

        tokio::task::yield_now().await;
    }
    debug!("Worker {} exited after {} requests", worker_id, issued);
}
