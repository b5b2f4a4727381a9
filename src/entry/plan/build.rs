use clap::ArgMatches;

use crate::args::{Command, PacerArgs, RequestArgs};
use crate::error::{AppError, AppResult, ConfigError};
use crate::run::RunConfig;

use super::types::{OneShotPlan, RequestPlan, RunPlan, ServePlan};

pub(crate) fn build_plan(args: PacerArgs, matches: &ArgMatches) -> AppResult<RunPlan> {
    let PacerArgs {
        mut command,
        config,
        ..
    } = args;
    apply_config(&mut command, config.as_deref(), matches)?;

    match command {
        Command::Run(run) => {
            let Some(target) = run.target.as_deref() else {
                tracing::error!("Missing target URL (set --target or provide it in config).");
                return Err(AppError::config(ConfigError::MissingTarget));
            };
            let config = RunConfig::new(target, run.concurrency.get(), run.duration, run.rps)?;
            Ok(RunPlan::Run(OneShotPlan {
                config,
                request: request_plan(run.request),
                no_progress: run.no_progress,
                output_format: run.output_format,
            }))
        }
        Command::Serve(serve) => Ok(RunPlan::Serve(ServePlan {
            listen: serve.listen,
            auth_token: serve.auth_token.filter(|token| !token.is_empty()),
            request: request_plan(serve.request),
        })),
    }
}

fn apply_config(
    command: &mut Command,
    path: Option<&str>,
    matches: &ArgMatches,
) -> AppResult<()> {
    let Some(config) = crate::config::load_config(path)? else {
        return Ok(());
    };
    let Some((_, sub_matches)) = matches.subcommand() else {
        return Ok(());
    };
    crate::config::apply_config(command, sub_matches, &config)?;
    Ok(())
}

fn request_plan(request: RequestArgs) -> RequestPlan {
    RequestPlan {
        timeout: request.timeout,
        query_pattern: request.query_pattern,
    }
}
