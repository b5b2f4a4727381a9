use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::info;

use crate::error::LifecycleError;
use crate::http::{QueryGenerator, RateLimiter, RequestExecutor};
use crate::metrics::{StatsAggregator, StatsSnapshot};

use super::pool::{WorkerDeps, run_worker_pool};
use super::{RunConfig, RunConfigSummary, StopHandle, stop_channel};

/// Lifecycle of the controller's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartAck {
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopAck {
    pub run_id: String,
}

/// Live view of the current (or most recent) run.
#[derive(Debug, Clone)]
pub struct RunStatus {
    pub run_id: Option<String>,
    pub running: bool,
    pub elapsed: Duration,
    pub config: Option<RunConfigSummary>,
    pub stats: StatsSnapshot,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct FinalReport {
    pub run_id: String,
    pub config: RunConfigSummary,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
    pub interrupted: bool,
}

struct ActiveRun {
    run_id: String,
    config: RunConfig,
    stats: Arc<StatsAggregator>,
    started_at: Instant,
    deadline: Instant,
    ended_at: Option<Instant>,
    stop: StopHandle,
    finished: watch::Receiver<bool>,
    interrupted: bool,
}

impl ActiveRun {
    fn elapsed(&self) -> Duration {
        self.ended_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }
}

struct ControllerState {
    phase: RunPhase,
    current: Option<ActiveRun>,
}

/// Owns at most one running load test at a time.
///
/// Both front ends drive runs through this type: the CLI calls
/// [`RunController::run_to_completion`], the control server calls
/// `start`/`status`/`stop`. Cloning shares the same state.
#[derive(Clone)]
pub struct RunController {
    executor: Arc<dyn RequestExecutor>,
    queries: Arc<QueryGenerator>,
    state: Arc<Mutex<ControllerState>>,
}

impl RunController {
    #[must_use]
    pub fn new(executor: Arc<dyn RequestExecutor>, queries: Arc<QueryGenerator>) -> Self {
        Self {
            executor,
            queries,
            state: Arc::new(Mutex::new(ControllerState {
                phase: RunPhase::Idle,
                current: None,
            })),
        }
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.lock_state().phase
    }

    /// Launches a run in the background and returns immediately.
    ///
    /// Stats from the previous run are discarded. Must be called from within
    /// a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` without touching the current run when one is
    /// in progress.
    pub async fn start(&self, config: RunConfig) -> Result<StartAck, LifecycleError> {
        let mut state = self.lock_state();
        if state.phase == RunPhase::Running {
            return Err(LifecycleError::AlreadyRunning);
        }

        let run_id = build_run_id();
        let started_at = Instant::now();
        let deadline = started_at
            .checked_add(config.duration())
            .unwrap_or_else(|| far_future(started_at));
        let stats = Arc::new(StatsAggregator::new());
        let deps = WorkerDeps {
            executor: Arc::clone(&self.executor),
            queries: Arc::clone(&self.queries),
            limiter: Arc::new(RateLimiter::starting_at(config.rps(), started_at)),
            stats: Arc::clone(&stats),
        };
        let (stop, signal) = stop_channel();
        let (finished_tx, finished_rx) = watch::channel(false);

        info!(
            "Starting run {}: target={} concurrency={} duration={:?} rps={}",
            run_id,
            config.target(),
            config.concurrency(),
            config.duration(),
            config.rps()
        );

        let supervisor_state = Arc::clone(&self.state);
        let supervisor_id = run_id.clone();
        let pool_config = config.clone();
        tokio::spawn(async move {
            run_worker_pool(&pool_config, &deps, deadline, &signal).await;
            mark_completed(&supervisor_state, &supervisor_id);
            finished_tx.send_replace(true);
        });

        state.current = Some(ActiveRun {
            run_id: run_id.clone(),
            config,
            stats,
            started_at,
            deadline,
            ended_at: None,
            stop,
            finished: finished_rx,
            interrupted: false,
        });
        state.phase = RunPhase::Running;
        drop(state);

        Ok(StartAck { run_id })
    }

    /// Signals every worker to stop and waits until all of them have exited.
    ///
    /// A stop that arrives after the deadline does not mark the run
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` when no run is in progress, including a second
    /// stop of the same run.
    pub async fn stop(&self) -> Result<StopAck, LifecycleError> {
        let (run_id, mut finished) = {
            let mut state = self.lock_state();
            if state.phase != RunPhase::Running {
                return Err(LifecycleError::NotRunning);
            }
            let Some(run) = state.current.as_mut() else {
                return Err(LifecycleError::NotRunning);
            };
            let now = Instant::now();
            run.stop.stop();
            // Past the deadline the run is only draining in-flight requests.
            run.interrupted = now < run.deadline;
            run.ended_at = Some(now);
            let handles = (run.run_id.clone(), run.finished.clone());
            state.phase = RunPhase::Stopped;
            handles
        };

        wait_finished(&mut finished).await;
        info!("Run {} stopped", run_id);
        Ok(StopAck { run_id })
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        let (base, stats) = {
            let state = self.lock_state();
            let Some(run) = state.current.as_ref() else {
                return RunStatus {
                    run_id: None,
                    running: false,
                    elapsed: Duration::ZERO,
                    config: None,
                    stats: StatsSnapshot::default(),
                };
            };
            let base = RunStatus {
                run_id: Some(run.run_id.clone()),
                running: state.phase == RunPhase::Running,
                elapsed: run.elapsed(),
                config: Some(run.config.summary()),
                stats: StatsSnapshot::default(),
            };
            (base, Arc::clone(&run.stats))
        };
        RunStatus {
            stats: stats.snapshot(),
            ..base
        }
    }

    /// Waits until the current run's workers have all exited.
    pub async fn wait_for_completion(&self) {
        let finished = self
            .lock_state()
            .current
            .as_ref()
            .map(|run| run.finished.clone());
        if let Some(mut finished) = finished {
            wait_finished(&mut finished).await;
        }
    }

    /// Report for the most recent run, once it is no longer running.
    #[must_use]
    pub fn final_report(&self) -> Option<FinalReport> {
        let state = self.lock_state();
        if state.phase == RunPhase::Running {
            return None;
        }
        let run = state.current.as_ref()?;
        Some(FinalReport {
            run_id: run.run_id.clone(),
            config: run.config.summary(),
            stats: run.stats.snapshot(),
            elapsed: run.elapsed(),
            interrupted: run.interrupted,
        })
    }

    /// Starts a run and blocks until the deadline passes or `stop` is called.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` if another run is in progress.
    pub async fn run_to_completion(&self, config: RunConfig) -> Result<FinalReport, LifecycleError> {
        let ack = self.start(config).await?;
        self.wait_for_completion().await;
        self.final_report()
            .filter(|report| report.run_id == ack.run_id)
            .ok_or(LifecycleError::NotRunning)
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Moves a run that reached its deadline to `Stopped`.
fn mark_completed(state: &Mutex<ControllerState>, run_id: &str) {
    let mut state = lock_state(state);
    if state.phase != RunPhase::Running {
        return;
    }
    let Some(run) = state.current.as_mut() else {
        return;
    };
    if run.run_id != run_id {
        return;
    }
    run.ended_at = Some(Instant::now());
    let total = run.stats.total_requests();
    state.phase = RunPhase::Stopped;
    drop(state);
    info!("Run {} completed with {} requests", run_id, total);
}

async fn wait_finished(finished: &mut watch::Receiver<bool>) {
    // A closed channel means the supervisor is gone, which is also terminal.
    drop(finished.wait_for(|done| *done).await.map(|_| ()));
}

fn far_future(now: Instant) -> Instant {
    now.checked_add(super::MAX_RUN_DURATION).unwrap_or(now)
}

/// Builds `run-<unix-millis>-<random hex>`.
#[must_use]
pub fn build_run_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    format!("run-{}-{:08x}", millis, rand::random::<u32>())
}
