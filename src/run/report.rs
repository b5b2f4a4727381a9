use std::time::Duration;

use serde::Serialize;

use crate::args::OutputFormat;
use crate::error::AppResult;
use crate::metrics::{RequestOutcome, StatsSnapshot, truncate_chars};

use super::{FinalReport, RunConfigSummary, RunStatus};

/// Characters of the last body shown in the final report.
pub const REPORT_SNIPPET_CHARS: usize = 1_000;
/// Characters of the last body shown on the live progress line.
pub const LIVE_SNIPPET_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastResponseView {
    pub status_code: Option<u16>,
    pub body: String,
}

impl LastResponseView {
    #[must_use]
    pub fn from_outcome(outcome: &RequestOutcome) -> Self {
        Self {
            status_code: outcome.status,
            body: outcome.body.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub run_id: String,
    pub interrupted: bool,
    pub config: RunConfigSummary,
    pub total_requests: u64,
    pub success: u64,
    pub failure: u64,
    pub average_response_time: Option<f64>,
    pub run_time: f64,
    pub last_response: Option<LastResponseView>,
}

impl ReportView {
    #[must_use]
    pub fn new(report: &FinalReport) -> Self {
        Self {
            run_id: report.run_id.clone(),
            interrupted: report.interrupted,
            config: report.config.clone(),
            total_requests: report.stats.total_requests,
            success: report.stats.success,
            failure: report.stats.failure,
            average_response_time: average_secs(&report.stats),
            run_time: report.elapsed.as_secs_f64(),
            last_response: report
                .stats
                .last_response
                .as_ref()
                .map(LastResponseView::from_outcome),
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub run_id: Option<String>,
    pub running: bool,
    pub config: Option<RunConfigSummary>,
    pub total_requests: u64,
    pub success: u64,
    pub failure: u64,
    pub average_response_time: Option<f64>,
    pub elapsed: f64,
    pub last_response: Option<LastResponseView>,
}

impl StatusView {
    #[must_use]
    pub fn new(status: &RunStatus) -> Self {
        Self {
            run_id: status.run_id.clone(),
            running: status.running,
            config: status.config.clone(),
            total_requests: status.stats.total_requests,
            success: status.stats.success,
            failure: status.stats.failure,
            average_response_time: average_secs(&status.stats),
            elapsed: status.elapsed.as_secs_f64(),
            last_response: status
                .stats
                .last_response
                .as_ref()
                .map(LastResponseView::from_outcome),
        }
    }
}

fn average_secs(stats: &StatsSnapshot) -> Option<f64> {
    stats.average_latency().map(|avg| avg.as_secs_f64())
}

/// Renders the final report in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialisation fails.
pub fn render_report(report: &FinalReport, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&ReportView::new(report))?),
    }
}

#[must_use]
pub fn render_text(report: &FinalReport) -> String {
    let stats = &report.stats;
    let mut lines = vec![
        "--- result ---".to_owned(),
        format!("total requests: {}", stats.total_requests),
        format!("success: {}", stats.success),
        format!("failure: {}", stats.failure),
        format!(
            "average response time: {}",
            stats
                .average_latency()
                .map_or_else(|| "-".to_owned(), format_secs)
        ),
        format!("run time: {}", format_secs(report.elapsed)),
    ];
    match stats.last_response.as_ref() {
        Some(last) => {
            lines.push(format!("last response status: {}", format_status(last.status)));
            lines.push("last response body snippet:".to_owned());
            lines.push(flatten_snippet(&last.body, REPORT_SNIPPET_CHARS));
        }
        None => lines.push("last response: -".to_owned()),
    }
    lines.join("\n")
}

/// One-line live status: `elapsed=.. | total=.. | ... | <snippet>`.
#[must_use]
pub fn render_live_line(status: &RunStatus) -> String {
    let stats = &status.stats;
    let (last, snippet) = stats.last_response.as_ref().map_or_else(
        || ("-".to_owned(), String::new()),
        |outcome| {
            (
                format_status(outcome.status),
                flatten_snippet(&outcome.body, LIVE_SNIPPET_CHARS),
            )
        },
    );
    format!(
        "elapsed={}s | total={} | success={} | failure={} | avg={} | last={} | {}",
        status.elapsed.as_secs(),
        stats.total_requests,
        stats.success,
        stats.failure,
        stats
            .average_latency()
            .map_or_else(|| "-".to_owned(), format_secs),
        last,
        snippet
    )
}

/// Replaces line breaks with spaces and keeps at most `max_chars`.
#[must_use]
pub fn flatten_snippet(body: &str, max_chars: usize) -> String {
    let flat: String = body
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect();
    truncate_chars(&flat, max_chars)
}

/// Seconds with millisecond precision, e.g. `0.012s`.
#[must_use]
pub fn format_secs(duration: Duration) -> String {
    let millis = duration.as_millis();
    let whole = millis.checked_div(1_000).unwrap_or(0);
    let frac = millis.checked_rem(1_000).unwrap_or(0);
    format!("{}.{:03}s", whole, frac)
}

fn format_status(status: Option<u16>) -> String {
    status.map_or_else(|| "-".to_owned(), |code| code.to_string())
}
