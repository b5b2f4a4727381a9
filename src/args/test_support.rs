use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::error::{AppError, AppResult};

use super::PacerArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<PacerArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let (args, _) = parse_test_matches(args)?;
    Ok(args)
}

pub(crate) fn parse_test_matches<I, T>(args: I) -> AppResult<(PacerArgs, ArgMatches)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = PacerArgs::command()
        .try_get_matches_from(args)
        .map_err(AppError::from)?;
    let args = PacerArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}
