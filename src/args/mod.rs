//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod test_support;

pub use cli::{Command, PacerArgs, RequestArgs, RunArgs, ServeArgs};
pub use defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_DURATION, DEFAULT_LISTEN, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_USER_AGENT,
};
pub use types::{OutputFormat, PositiveUsize};

pub(crate) use parsers::{parse_duration, parse_listen_addr};
#[cfg(test)]
pub(crate) use test_support::{parse_test_args, parse_test_matches};
