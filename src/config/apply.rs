use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{Command, PositiveUsize, RequestArgs, RunArgs, ServeArgs, parse_listen_addr};
use crate::error::{ConfigError, ValidationError};
use crate::http::Rate;

use super::types::ConfigFile;

/// Fills every argument the user did not set explicitly from the config file.
///
/// `matches` are the subcommand's own matches.
///
/// # Errors
///
/// Returns an error when a config value is invalid.
pub fn apply_config(
    command: &mut Command,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> Result<(), ConfigError> {
    match command {
        Command::Run(args) => apply_run(args, matches, config),
        Command::Serve(args) => apply_serve(args, matches, config),
    }
}

fn apply_run(
    args: &mut RunArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> Result<(), ConfigError> {
    if !is_explicit(matches, "target")
        && let Some(target) = config.target.clone()
    {
        args.target = Some(target);
    }

    if !is_explicit(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = PositiveUsize::try_from(concurrency)
            .map_err(|source| invalid_field("concurrency", source))?;
    }

    if !is_explicit(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = duration
            .to_duration()
            .map_err(|source| invalid_field("duration", source))?;
    }

    if !is_explicit(matches, "rps")
        && let Some(rps) = config.rps
    {
        args.rps = Rate::from_rps(rps)?;
    }

    if !is_explicit(matches, "no_progress")
        && let Some(no_progress) = config.no_progress
    {
        args.no_progress = no_progress;
    }

    if !is_explicit(matches, "output_format")
        && let Some(format) = config.output_format
    {
        args.output_format = format;
    }

    apply_request(&mut args.request, matches, config)
}

fn apply_serve(
    args: &mut ServeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> Result<(), ConfigError> {
    if !is_explicit(matches, "listen")
        && let Some(listen) = config.listen.as_deref()
    {
        args.listen = parse_listen_addr(listen).map_err(|source| invalid_field("listen", source))?;
    }

    if !is_explicit(matches, "auth_token")
        && let Some(token) = config.auth_token.clone()
    {
        args.auth_token = Some(token);
    }

    apply_request(&mut args.request, matches, config)
}

fn apply_request(
    args: &mut RequestArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> Result<(), ConfigError> {
    if !is_explicit(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = timeout
            .to_duration()
            .map_err(|source| invalid_field("timeout", source))?;
    }

    if !is_explicit(matches, "query_pattern")
        && let Some(pattern) = config.query_pattern.clone()
    {
        args.query_pattern = pattern;
    }

    Ok(())
}

fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

const fn invalid_field(field: &'static str, source: ValidationError) -> ConfigError {
    ConfigError::InvalidField { field, source }
}
