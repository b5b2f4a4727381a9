use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ControlError};
use crate::http::Rate;
use crate::run::{RunConfig, StatusView};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of `POST /start`, as JSON or as an urlencoded form.
///
/// `duration` is in seconds and may be fractional; `rps` defaults to `0`
/// (unlimited).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct StartRequest {
    pub target: Option<String>,
    pub concurrency: Option<u64>,
    pub duration: Option<f64>,
    pub rps: Option<f64>,
}

impl StartRequest {
    /// Decodes the body according to its content type. Without one, a body
    /// starting with `{` is read as JSON and anything else as a form.
    ///
    /// # Errors
    ///
    /// Returns a 400 error for malformed bodies and non-numeric fields.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, ControlError> {
        let is_json = match content_type {
            Some(JSON_CONTENT_TYPE) => true,
            Some(FORM_CONTENT_TYPE) => false,
            Some(_) | None => body
                .iter()
                .find(|byte| !byte.is_ascii_whitespace())
                .is_some_and(|byte| *byte == b'{'),
        };
        if is_json {
            serde_json::from_slice(body)
                .map_err(|err| ControlError::bad_request(format!("Invalid JSON: {}", err)))
        } else {
            Self::from_form(body)
        }
    }

    fn from_form(body: &[u8]) -> Result<Self, ControlError> {
        let mut request = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            let value = value.trim();
            match &*key {
                "target" => request.target = Some(value.to_owned()),
                "concurrency" => request.concurrency = Some(parse_field("concurrency", value)?),
                "duration" => request.duration = Some(parse_field("duration", value)?),
                "rps" if value.is_empty() => {}
                "rps" => request.rps = Some(parse_field("rps", value)?),
                _ => {}
            }
        }
        Ok(request)
    }

    /// Validates the request into a run configuration.
    ///
    /// # Errors
    ///
    /// Returns a 400 error naming the missing or invalid field.
    pub fn into_config(self) -> Result<RunConfig, ControlError> {
        let target = self.target.ok_or(ConfigError::MissingTarget)?;
        let concurrency = self
            .concurrency
            .ok_or_else(|| missing_field("concurrency"))?;
        let concurrency = usize::try_from(concurrency)
            .map_err(|err| ControlError::bad_request(format!("Invalid concurrency: {}", err)))?;
        let duration_secs = self.duration.ok_or_else(|| missing_field("duration"))?;
        let duration = Duration::try_from_secs_f64(duration_secs)
            .map_err(|err| ControlError::bad_request(format!("Invalid duration: {}", err)))?;
        let rps = Rate::from_rps(self.rps.unwrap_or_default())?;
        Ok(RunConfig::new(&target, concurrency, duration, rps)?)
    }
}

fn parse_field<T>(field: &str, value: &str) -> Result<T, ControlError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err| ControlError::bad_request(format!("Invalid value for '{}': {}", field, err)))
}

fn missing_field(field: &str) -> ControlError {
    ControlError::bad_request(format!("Missing field '{}'", field))
}

/// Body of a successful `POST /start` or `POST /stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlReply {
    Ack(ControlResponse),
    Status(StatusView),
}
