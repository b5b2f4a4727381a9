mod app;
mod config;
mod control;
mod http;
mod lifecycle;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use control::ControlError;
pub use http::HttpError;
pub use lifecycle::LifecycleError;
pub use validation::ValidationError;
