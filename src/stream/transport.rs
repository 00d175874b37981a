//! HTTP transport for the analysis service

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::consumer::{AnalysisRequest, AnalysisTransport, ByteStream};
use crate::error::{Error, Result};

/// Posts analysis requests to `{base_url}/ai` and streams the response body
#[derive(Debug, Clone)]
pub struct HttpAnalysisTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl AnalysisTransport for HttpAnalysisTransport {
    async fn open(&self, request: &AnalysisRequest) -> Result<Option<ByteStream>> {
        let url = format!("{}/ai", self.base_url.trim_end_matches('/'));
        debug!("Opening analysis stream at {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            warn!("Analysis service answered {}", status);
            return Ok(None);
        }

        let body = response.bytes_stream().map_err(Error::from);
        Ok(Some(Box::pin(body)))
    }
}
