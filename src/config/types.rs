use std::time::Duration;

use serde::Deserialize;

use crate::args::{OutputFormat, parse_duration};
use crate::error::ValidationError;

/// Contents of `pacer.toml` / `pacer.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub target: Option<String>,
    pub concurrency: Option<usize>,
    pub duration: Option<DurationValue>,
    pub rps: Option<f64>,
    pub timeout: Option<DurationValue>,
    pub query_pattern: Option<String>,
    pub listen: Option<String>,
    pub auth_token: Option<String>,
    pub no_progress: Option<bool>,
    pub output_format: Option<OutputFormat>,
}

/// Either whole seconds (`30`) or a duration string (`"500ms"`, `"2m"`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}
