use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector returned error status {status}: {message}")]
    Collector { status: u16, message: String },
}

/// Downstream hand-off for a serialized batch. Delivery is fire-and-forget
/// at the run boundary: a failure is logged by the caller, never retried
/// here.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn deliver(&self, payload: String, filename: &str) -> Result<(), SinkError>;
}

/// Ships the tabular export as a multipart file upload to the configured
/// collector endpoint.
#[derive(Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BatchSink for HttpSink {
    async fn deliver(&self, payload: String, filename: &str) -> Result<(), SinkError> {
        let size = payload.len();
        let part = reqwest::multipart::Part::text(payload)
            .file_name(filename.to_string())
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(SinkError::Collector {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        tracing::debug!(url = %self.url, bytes = size, "Batch delivered");
        Ok(())
    }
}
