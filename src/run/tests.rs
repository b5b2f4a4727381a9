use super::*;
use crate::args::OutputFormat;
use crate::error::{AppError, AppResult, ConfigError, LifecycleError};
use crate::http::{DEFAULT_QUERY_PATTERN, QueryGenerator, QueryParams, Rate, RequestExecutor};
use crate::metrics::{RequestOutcome, StatsSnapshot};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const TARGET: &str = "http://x/api/search";

fn run_paused_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

#[derive(Debug, Clone, Copy)]
enum MockMode {
    Success,
    TransportFailure,
}

struct MockExecutor {
    delay: Duration,
    mode: MockMode,
    calls: AtomicU64,
}

impl MockExecutor {
    fn new(delay: Duration, mode: MockMode) -> Arc<Self> {
        Arc::new(Self {
            delay,
            mode,
            calls: AtomicU64::new(0),
        })
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, _target: &Url, params: &QueryParams) -> RequestOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.mode {
            MockMode::Success => {
                let body = format!("{{\"q\":\"{}\"}}\nok", params.name);
                RequestOutcome::completed(200, start.elapsed(), &body)
            }
            MockMode::TransportFailure => {
                RequestOutcome::transport_failure(start.elapsed(), "connection refused")
            }
        }
    }
}

fn controller_with(executor: Arc<MockExecutor>) -> AppResult<RunController> {
    let queries = Arc::new(QueryGenerator::new(DEFAULT_QUERY_PATTERN)?);
    Ok(RunController::new(executor, queries))
}

fn config(concurrency: usize, duration: Duration, rps: f64) -> AppResult<RunConfig> {
    Ok(RunConfig::new(
        TARGET,
        concurrency,
        duration,
        Rate::from_rps(rps)?,
    )?)
}

fn check_conservation(stats: &StatsSnapshot) -> AppResult<()> {
    if stats.total_requests != stats.success.saturating_add(stats.failure) {
        return Err(AppError::validation(format!(
            "total {} != success {} + failure {}",
            stats.total_requests, stats.success, stats.failure
        )));
    }
    Ok(())
}

#[test]
fn run_config_rejects_invalid_values() -> AppResult<()> {
    let second = Duration::from_secs(1);
    let checks = [
        (
            matches!(
                RunConfig::new(TARGET, 0, second, Rate::UNLIMITED),
                Err(ConfigError::ConcurrencyZero)
            ),
            "Expected ConcurrencyZero",
        ),
        (
            matches!(
                RunConfig::new(
                    TARGET,
                    MAX_CONCURRENCY.saturating_add(1),
                    second,
                    Rate::UNLIMITED
                ),
                Err(ConfigError::ConcurrencyTooHigh { .. })
            ),
            "Expected ConcurrencyTooHigh",
        ),
        (
            matches!(
                RunConfig::new(TARGET, 1, Duration::ZERO, Rate::UNLIMITED),
                Err(ConfigError::DurationZero)
            ),
            "Expected DurationZero",
        ),
        (
            matches!(
                RunConfig::new(
                    TARGET,
                    1,
                    MAX_RUN_DURATION.saturating_add(second),
                    Rate::UNLIMITED
                ),
                Err(ConfigError::DurationTooLong { .. })
            ),
            "Expected DurationTooLong",
        ),
        (
            matches!(
                RunConfig::new("not a url", 1, second, Rate::UNLIMITED),
                Err(ConfigError::InvalidTarget { .. })
            ),
            "Expected InvalidTarget",
        ),
        (
            matches!(
                RunConfig::new("ftp://host/file", 1, second, Rate::UNLIMITED),
                Err(ConfigError::UnsupportedScheme { .. })
            ),
            "Expected UnsupportedScheme",
        ),
        (
            matches!(
                RunConfig::new("   ", 1, second, Rate::UNLIMITED),
                Err(ConfigError::MissingTarget)
            ),
            "Expected MissingTarget",
        ),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(AppError::validation(message));
        }
    }
    Ok(())
}

#[test]
fn run_config_keeps_validated_values() -> AppResult<()> {
    let config = config(5, Duration::from_secs(2), 0.5)?;
    if config.target().as_str() != TARGET
        || config.concurrency().get() != 5
        || config.duration() != Duration::from_secs(2)
        || config.rps().micros_per_sec() != 500_000
    {
        return Err(AppError::validation(format!(
            "Unexpected config: {:?}",
            config
        )));
    }
    Ok(())
}

#[test]
fn stop_signal_resolves_after_stop() -> AppResult<()> {
    run_paused_test(async {
        let (handle, mut signal) = stop_channel();
        if signal.is_stopped() || handle.is_stopped() {
            return Err(AppError::validation("Signal should start clear"));
        }
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), signal.stopped())
            .await
            .map_err(|_elapsed| AppError::validation("Stop signal never resolved"))?;
        if !signal.is_stopped() {
            return Err(AppError::validation("Signal should report stopped"));
        }
        Ok(())
    })
}

#[test]
fn scenario_paced_success_run() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_millis(10), MockMode::Success);
        let controller = controller_with(Arc::clone(&executor))?;
        let report = controller
            .run_to_completion(config(5, Duration::from_secs(2), 10.0)?)
            .await?;

        let stats = &report.stats;
        check_conservation(stats)?;
        if !(15..=25).contains(&stats.total_requests) {
            return Err(AppError::validation(format!(
                "Expected 15..=25 requests, got {}",
                stats.total_requests
            )));
        }
        if stats.success != stats.total_requests || stats.failure != 0 {
            return Err(AppError::validation("Expected only successes"));
        }
        if stats.total_requests != executor.calls() {
            return Err(AppError::validation("Recorded and executed counts differ"));
        }
        let avg = stats
            .average_latency()
            .ok_or_else(|| AppError::validation("Missing average"))?;
        if avg < Duration::from_millis(10) || avg > Duration::from_millis(15) {
            return Err(AppError::validation(format!(
                "Expected ~10ms average, got {:?}",
                avg
            )));
        }
        if report.interrupted {
            return Err(AppError::validation("Run completed naturally"));
        }
        if stats.last_response.is_none() {
            return Err(AppError::validation("Expected a last response"));
        }
        Ok(())
    })
}

#[test]
fn scenario_all_transport_failures() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_millis(5), MockMode::TransportFailure);
        let controller = controller_with(executor)?;
        let report = controller
            .run_to_completion(config(3, Duration::from_secs(1), 20.0)?)
            .await?;

        let stats = &report.stats;
        check_conservation(stats)?;
        if stats.total_requests == 0 || stats.success != 0 {
            return Err(AppError::validation(format!(
                "Expected only failures, got {:?}",
                stats
            )));
        }
        let last = stats
            .last_response
            .as_ref()
            .ok_or_else(|| AppError::validation("Missing last response"))?;
        if last.status.is_some() || last.body.is_empty() {
            return Err(AppError::validation("Last outcome should be a transport failure"));
        }
        Ok(())
    })
}

#[test]
fn fractional_rate_run_stays_under_ceiling() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::ZERO, MockMode::Success);
        let controller = controller_with(executor)?;
        let report = controller
            .run_to_completion(config(4, Duration::from_secs(9), 0.5)?)
            .await?;
        // ceil(0.5 * 9) + 1 token of burst capacity
        if report.stats.total_requests > 6 || report.stats.total_requests < 3 {
            return Err(AppError::validation(format!(
                "Unexpected request count {}",
                report.stats.total_requests
            )));
        }
        Ok(())
    })
}

#[test]
fn unlimited_run_is_bounded_only_by_executor() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_millis(100), MockMode::Success);
        let controller = controller_with(Arc::clone(&executor))?;
        let report = controller
            .run_to_completion(config(4, Duration::from_secs(1), 0.0)?)
            .await?;
        // 4 workers * 10 requests of 100ms each.
        let total = report.stats.total_requests;
        if !(36..=44).contains(&total) {
            return Err(AppError::validation(format!(
                "Expected ~40 requests, got {}",
                total
            )));
        }
        check_conservation(&report.stats)?;
        Ok(())
    })
}

#[test]
fn second_start_is_rejected_and_leaves_run_untouched() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_millis(10), MockMode::Success);
        let controller = controller_with(executor)?;
        let first = controller
            .start(config(2, Duration::from_secs(60), 0.0)?)
            .await?;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let second = controller
            .start(config(9, Duration::from_secs(1), 1.0)?)
            .await;
        if second != Err(LifecycleError::AlreadyRunning) {
            return Err(AppError::validation(format!(
                "Expected AlreadyRunning, got {:?}",
                second
            )));
        }

        let status = controller.status();
        if status.run_id.as_deref() != Some(first.run_id.as_str()) || !status.running {
            return Err(AppError::validation("First run should still be current"));
        }
        let concurrency = status.config.as_ref().map(|summary| summary.concurrency);
        if concurrency != Some(2) || status.stats.total_requests == 0 {
            return Err(AppError::validation(format!(
                "First run state was replaced: {:?}",
                status
            )));
        }

        controller.stop().await?;
        Ok(())
    })
}

#[test]
fn stop_halts_new_requests_and_rejects_repeat() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_millis(10), MockMode::Success);
        let controller = controller_with(Arc::clone(&executor))?;
        let started = controller
            .start(config(4, Duration::from_secs(60), 0.0)?)
            .await?;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stopped = controller.stop().await?;
        if stopped.run_id != started.run_id {
            return Err(AppError::validation("Stop acknowledged another run"));
        }
        let status = controller.status();
        if status.running || controller.phase() != RunPhase::Stopped {
            return Err(AppError::validation("Run should no longer be running"));
        }

        let calls_at_stop = executor.calls();
        let recorded_at_stop = status.stats.total_requests;
        tokio::time::sleep(Duration::from_secs(1)).await;
        if executor.calls() != calls_at_stop {
            return Err(AppError::validation("Requests issued after stop"));
        }
        if controller.status().stats.total_requests != recorded_at_stop {
            return Err(AppError::validation("Stats changed after stop"));
        }
        if calls_at_stop != recorded_at_stop {
            return Err(AppError::validation("In-flight requests were not recorded"));
        }

        if controller.stop().await.err() != Some(LifecycleError::NotRunning) {
            return Err(AppError::validation("Second stop should be rejected"));
        }
        let report = controller
            .final_report()
            .ok_or_else(|| AppError::validation("Missing final report"))?;
        if !report.interrupted {
            return Err(AppError::validation("Stopped run should be interrupted"));
        }
        Ok(())
    })
}

#[test]
fn stop_after_deadline_is_not_an_interruption() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_secs(5), MockMode::Success);
        let controller = controller_with(Arc::clone(&executor))?;
        controller
            .start(config(1, Duration::from_secs(1), 0.0)?)
            .await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        if controller.phase() != RunPhase::Running {
            return Err(AppError::validation("Run should still be draining"));
        }

        controller.stop().await?;
        let report = controller
            .final_report()
            .ok_or_else(|| AppError::validation("Missing final report"))?;
        let checks = [
            (!report.interrupted, "Run past its deadline should not be interrupted"),
            (report.stats.total_requests == 1, "In-flight request should be recorded"),
            (executor.calls() == 1, "Only one request should have started"),
        ];
        for (ok, message) in checks {
            if !ok {
                return Err(AppError::validation(message));
            }
        }
        Ok(())
    })
}

#[test]
fn stop_before_any_run_is_rejected() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::ZERO, MockMode::Success);
        let controller = controller_with(executor)?;
        if controller.stop().await.err() != Some(LifecycleError::NotRunning) {
            return Err(AppError::validation("Expected NotRunning"));
        }
        let status = controller.status();
        if status.run_id.is_some() || status.running || controller.phase() != RunPhase::Idle {
            return Err(AppError::validation("Idle controller reported a run"));
        }
        if controller.final_report().is_some() {
            return Err(AppError::validation("Idle controller has no report"));
        }
        Ok(())
    })
}

#[test]
fn restart_after_completion_resets_stats() -> AppResult<()> {
    run_paused_test(async {
        let executor = MockExecutor::new(Duration::from_millis(10), MockMode::Success);
        let controller = controller_with(executor)?;
        let first = controller
            .run_to_completion(config(1, Duration::from_millis(500), 10.0)?)
            .await?;
        if controller.stop().await.err() != Some(LifecycleError::NotRunning) {
            return Err(AppError::validation("Completed run cannot be stopped"));
        }

        let second = controller
            .start(config(1, Duration::from_secs(30), 1.0)?)
            .await?;
        if second.run_id == first.run_id {
            return Err(AppError::validation("Expected a fresh run id"));
        }
        let status = controller.status();
        if status.stats.total_requests != 0 || !status.running {
            return Err(AppError::validation(format!(
                "Expected reset stats, got {:?}",
                status.stats
            )));
        }
        controller.stop().await?;
        Ok(())
    })
}

#[test]
fn text_report_without_requests_uses_placeholders() -> AppResult<()> {
    let report = FinalReport {
        run_id: "run-1-0".to_owned(),
        config: config(1, Duration::from_secs(1), 0.0)?.summary(),
        stats: StatsSnapshot::default(),
        elapsed: Duration::from_millis(1_004),
        interrupted: false,
    };
    let text = render_text(&report);
    let expected = [
        "--- result ---",
        "total requests: 0",
        "success: 0",
        "failure: 0",
        "average response time: -",
        "run time: 1.004s",
        "last response: -",
    ]
    .join("\n");
    if text != expected {
        return Err(AppError::validation(format!("Unexpected report:\n{}", text)));
    }
    Ok(())
}

#[test]
fn text_report_flattens_last_body() -> AppResult<()> {
    let stats = StatsSnapshot {
        total_requests: 2,
        success: 1,
        failure: 1,
        total_latency: Duration::from_millis(30),
        last_response: Some(RequestOutcome::completed(
            404,
            Duration::from_millis(20),
            "line one\nline two",
        )),
    };
    let report = FinalReport {
        run_id: "run-1-0".to_owned(),
        config: config(1, Duration::from_secs(1), 0.0)?.summary(),
        stats,
        elapsed: Duration::from_secs(2),
        interrupted: true,
    };
    let text = render_text(&report);
    let wanted = [
        "average response time: 0.015s",
        "last response status: 404",
        "last response body snippet:\nline one line two",
    ];
    for line in wanted {
        if !text.contains(line) {
            return Err(AppError::validation(format!(
                "Report missing '{}':\n{}",
                line, text
            )));
        }
    }
    Ok(())
}

#[test]
fn json_report_carries_counts_and_last_response() -> AppResult<()> {
    let stats = StatsSnapshot {
        total_requests: 1,
        success: 0,
        failure: 1,
        total_latency: Duration::from_millis(250),
        last_response: Some(RequestOutcome::transport_failure(
            Duration::from_millis(250),
            "timed out",
        )),
    };
    let report = FinalReport {
        run_id: "run-1-0".to_owned(),
        config: config(1, Duration::from_secs(1), 0.0)?.summary(),
        stats,
        elapsed: Duration::from_secs(1),
        interrupted: false,
    };
    let rendered = render_report(&report, OutputFormat::Json)?;
    let value: serde_json::Value = serde_json::from_str(&rendered)?;
    let checks = [
        (value.get("total_requests").and_then(serde_json::Value::as_u64) == Some(1), "total"),
        (value.get("failure").and_then(serde_json::Value::as_u64) == Some(1), "failure"),
        (
            value
                .get("last_response")
                .and_then(|last| last.get("status_code"))
                .is_some_and(serde_json::Value::is_null),
            "status_code",
        ),
        (
            value
                .get("last_response")
                .and_then(|last| last.get("body"))
                .and_then(serde_json::Value::as_str)
                == Some("exception: timed out"),
            "body",
        ),
        (
            value
                .get("average_response_time")
                .and_then(serde_json::Value::as_f64)
                .is_some(),
            "average",
        ),
    ];
    for (ok, field) in checks {
        if !ok {
            return Err(AppError::validation(format!(
                "Unexpected JSON field {}: {}",
                field, rendered
            )));
        }
    }
    Ok(())
}

#[test]
fn live_line_shows_counters_and_snippet() -> AppResult<()> {
    let long_body = format!("head\n{}", "x".repeat(400));
    let stats = StatsSnapshot {
        total_requests: 3,
        success: 3,
        failure: 0,
        total_latency: Duration::from_millis(36),
        last_response: Some(RequestOutcome::completed(
            200,
            Duration::from_millis(12),
            &long_body,
        )),
    };
    let status = RunStatus {
        run_id: Some("run-1-0".to_owned()),
        running: true,
        elapsed: Duration::from_millis(3_400),
        config: None,
        stats,
    };
    let line = render_live_line(&status);
    let prefix = "elapsed=3s | total=3 | success=3 | failure=0 | avg=0.012s | last=200 | head x";
    if !line.starts_with(prefix) {
        return Err(AppError::validation(format!("Unexpected live line: {}", line)));
    }
    let snippet = line.rsplit(" | ").next().unwrap_or_default();
    if snippet.chars().count() != LIVE_SNIPPET_CHARS {
        return Err(AppError::validation(format!(
            "Snippet not truncated: {} chars",
            snippet.chars().count()
        )));
    }
    Ok(())
}

#[test]
fn run_ids_are_prefixed_and_distinct() -> AppResult<()> {
    let first = build_run_id();
    let second = build_run_id();
    if !first.starts_with("run-") || first.split('-').count() != 3 {
        return Err(AppError::validation(format!("Unexpected run id {}", first)));
    }
    if first == second {
        return Err(AppError::validation("Run ids should differ"));
    }
    Ok(())
}
