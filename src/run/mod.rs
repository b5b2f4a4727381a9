//! Run lifecycle: validated config, worker pool, controller and reporting.
mod config;
mod controller;
mod pool;
mod progress;
mod report;
mod stop;

#[cfg(test)]
mod tests;

pub use config::{MAX_CONCURRENCY, MAX_RUN_DURATION, RunConfig, RunConfigSummary};
pub use controller::{
    FinalReport, RunController, RunPhase, RunStatus, StartAck, StopAck, build_run_id,
};
pub use pool::{WorkerDeps, run_worker_pool};
pub use progress::{PROGRESS_INTERVAL, setup_progress_reporter};
pub use report::{
    LIVE_SNIPPET_CHARS, LastResponseView, REPORT_SNIPPET_CHARS, ReportView, StatusView,
    flatten_snippet, format_secs, render_live_line, render_report, render_text,
};
pub use stop::{StopHandle, StopSignal, stop_channel};
