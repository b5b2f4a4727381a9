use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;

use crate::http::{DEFAULT_QUERY_PATTERN, Rate};

use super::defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_DURATION, DEFAULT_LISTEN, DEFAULT_REQUEST_TIMEOUT,
};
use super::parsers::{parse_duration_arg, parse_listen_addr, parse_positive_usize, parse_rps};
use super::types::{OutputFormat, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Paced async HTTP GET load generator - token-bucket rate limiting, live stats, one-shot runs and a start/stop/status control API."
)]
pub struct PacerArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML or JSON); defaults to ./pacer.toml or ./pacer.json
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Enable debug logging (PACER_LOG / RUST_LOG take precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run one load test and print the result
    Run(RunArgs),
    /// Serve the start/stop/status control API
    Serve(ServeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Target URL (GET requests with randomized `q` and `loadMore` parameters)
    #[arg(long, short = 'u')]
    pub target: Option<String>,

    /// Number of concurrent workers
    #[arg(long, short = 'c', default_value = DEFAULT_CONCURRENCY, value_parser = parse_positive_usize)]
    pub concurrency: PositiveUsize,

    /// Run duration (bare numbers are seconds; supports ms/s/m/h)
    #[arg(long, short = 'd', default_value = DEFAULT_DURATION, value_parser = parse_duration_arg)]
    pub duration: Duration,

    /// Target requests per second across all workers (fractions allowed, 0 = unlimited)
    #[arg(long, default_value = "0", value_parser = parse_rps)]
    pub rps: Rate,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Disable the live status line on stderr
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Final report format
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Address for the control API
    #[arg(long, default_value = DEFAULT_LISTEN, value_parser = parse_listen_addr)]
    pub listen: SocketAddr,

    /// Bearer token required on every control request
    #[arg(long = "auth-token", env = "PACER_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Request settings shared by both front ends.
#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    /// Per-request timeout (supports ms/s/m/h)
    #[arg(long, default_value = DEFAULT_REQUEST_TIMEOUT, value_parser = parse_duration_arg)]
    pub timeout: Duration,

    /// Regex used to generate the random `q` parameter
    #[arg(long = "query-pattern", default_value = DEFAULT_QUERY_PATTERN, hide_default_value = true)]
    pub query_pattern: String,
}
