use std::net::SocketAddr;
use std::time::Duration;

use crate::args::OutputFormat;
use crate::run::RunConfig;

/// Settings for the request executor shared by both front ends.
pub(in crate::entry) struct RequestPlan {
    pub(super) timeout: Duration,
    pub(super) query_pattern: String,
}

pub(in crate::entry) struct OneShotPlan {
    pub(super) config: RunConfig,
    pub(super) request: RequestPlan,
    pub(super) no_progress: bool,
    pub(super) output_format: OutputFormat,
}

pub(in crate::entry) struct ServePlan {
    pub(super) listen: SocketAddr,
    pub(super) auth_token: Option<String>,
    pub(super) request: RequestPlan,
}

pub(in crate::entry) enum RunPlan {
    Run(OneShotPlan),
    Serve(ServePlan),
}
