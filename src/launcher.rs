#![forbid(unsafe_code)]

// Test launcher - builds the start-test payload and submits it to the runner

use crate::protocol::{ChannelIdentity, StartTestRequest};
use crate::validate::TestConfig;
use std::future::Future;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("test request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("runner rejected the test with HTTP {status}")]
    Rejected { status: u16 },
}

/// Sends a start-test request. Only success or failure is reported back.
pub trait Submitter: Send + Sync + 'static {
    fn submit(
        &self,
        request: StartTestRequest,
    ) -> impl Future<Output = Result<(), SubmitError>> + Send;
}

/// Tag a validated configuration with the channel it should report on.
pub fn build_request(config: &TestConfig, channel_id: &ChannelIdentity) -> StartTestRequest {
    StartTestRequest {
        concurrency: config.concurrency.get(),
        endpoint: config.endpoint.clone(),
        method: config.method.clone(),
        headers: config.headers.clone(),
        body: config.body.clone(),
        channel_id: channel_id.clone(),
        ws_id: channel_id.clone(),
        end_flags: config.end_flags.clone(),
    }
}

/// POSTs the payload as JSON to the runner's start-test endpoint.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: Url,
}

impl HttpSubmitter {
    pub fn new(url: Url) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

impl Submitter for HttpSubmitter {
    fn submit(
        &self,
        request: StartTestRequest,
    ) -> impl Future<Output = Result<(), SubmitError>> + Send {
        let client = self.client.clone();
        let url = self.url.clone();
        async move {
            debug!(
                "Submitting {} session(s) against {} {}",
                request.concurrency, request.method, request.endpoint
            );
            let response = client.post(url).json(&request).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SubmitError::Rejected { status: status.as_u16() });
            }
            Ok(())
        }
    }
}
