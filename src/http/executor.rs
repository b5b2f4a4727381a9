use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use tokio::time::Instant;
use tracing::debug;

use crate::metrics::{MAX_BODY_CHARS, RequestOutcome};

use super::QueryParams;

/// Bytes retained from a response body; enough for `MAX_BODY_CHARS` of UTF-8.
const MAX_BODY_BYTES: usize = MAX_BODY_CHARS.saturating_mul(4);

/// Sends one GET and reports what happened.
///
/// Implementations never fail: transport errors are returned as outcomes
/// without a status.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, target: &Url, params: &QueryParams) -> RequestOutcome;
}

/// `RequestExecutor` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    timeout: Duration,
}

impl HttpExecutor {
    #[must_use]
    pub const fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, target: &Url, params: &QueryParams) -> RequestOutcome {
        let start = Instant::now();
        let request = self
            .client
            .get(target.clone())
            .query(&params.pairs())
            .timeout(self.timeout);

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("Request failed: {}", err);
                return RequestOutcome::transport_failure(start.elapsed(), err);
            }
        };
        let status = response.status().as_u16();

        match read_body_prefix(response).await {
            Ok(bytes) => RequestOutcome::completed(status, start.elapsed(), &decode_body(&bytes)),
            Err(err) => {
                debug!("Failed to read response body: {}", err);
                RequestOutcome::transport_failure(start.elapsed(), err)
            }
        }
    }
}

/// Drains the whole body, keeping only the first `MAX_BODY_BYTES`.
async fn read_body_prefix(response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut kept: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        let room = MAX_BODY_BYTES.saturating_sub(kept.len());
        if room > 0 {
            kept.extend_from_slice(bytes.get(..room.min(bytes.len())).unwrap_or_default());
        }
    }
    Ok(kept)
}

/// Best-effort text decoding of a (possibly truncated) body.
///
/// A code point cut off by truncation is dropped; any other invalid UTF-8
/// falls back to lossy replacement.
#[must_use]
pub fn decode_body(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(err) if err.error_len().is_none() => {
            let valid = bytes.get(..err.valid_up_to()).unwrap_or_default();
            String::from_utf8_lossy(valid)
        }
        Err(_) => String::from_utf8_lossy(bytes),
    }
}
