mod args;
mod config;
mod control;
mod entry;
mod error;
mod http;
mod logger;
mod metrics;
mod run;
mod shutdown;
mod shutdown_handlers;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
