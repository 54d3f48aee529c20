use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use super::Ingestion;
use crate::error::CollaboratorError;
use crate::monitoring::types::ResultRecord;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Events API client, one NDJSON line per record
pub struct HttpIngestion {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpIngestion {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url, token })
    }
}

#[async_trait]
impl Ingestion for HttpIngestion {
    async fn send_event(&self, record: &ResultRecord, datasource: &str) -> Result<(), CollaboratorError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut request = self
            .client
            .post(format!("{}/v0/events", self.base_url))
            .query(&[("name", datasource)])
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(line);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        CollaboratorError::ensure_success(response).await?;
        Ok(())
    }
}
