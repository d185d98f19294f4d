use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::target::TargetDescriptor;

/// One call attempt: which logical request it belongs to and its retry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub slot: usize,
    pub index: u32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}

/// Issues a single call against the target and parses the JSON body.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        target: &TargetDescriptor,
        attempt: Attempt,
    ) -> impl Future<Output = Result<Value, AttemptError>> + Send;
}

/// Transport over one shared `reqwest::Client` connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
}

impl Transport for HttpTransport {
    async fn send(&self, target: &TargetDescriptor, attempt: Attempt) -> Result<Value, AttemptError> {
        tracing::trace!(target: "driver", slot = attempt.slot, index = attempt.index, "POST {}", target.url());
        let resp = self
            .client
            .post(target.url().clone())
            .headers(target.headers().clone())
            .json(target.payload())
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }
        resp.json::<Value>().await.map_err(|e| AttemptError::Decode(e.to_string()))
    }
}
