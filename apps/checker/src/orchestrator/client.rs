use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Orchestrator, StatusUpdate};
use crate::error::CollaboratorError;
use crate::models::MonitorSet;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator reached over HTTP/JSON
pub struct HttpOrchestrator {
    client: Client,
    base_url: String,
    token: Option<String>,
    region: String,
}

impl HttpOrchestrator {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        region: impl Into<String>,
    ) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url, token, region: region.into() })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    async fn list_monitors(&self) -> Result<MonitorSet, CollaboratorError> {
        let request = self
            .client
            .get(format!("{}/monitors", self.base_url))
            .query(&[("region", self.region.as_str())]);

        let response = self.authorize(request).send().await?;
        let response = CollaboratorError::ensure_success(response).await?;
        let body = response.bytes().await?;
        let monitors: MonitorSet = serde_json::from_slice(&body)?;

        debug!(region = %self.region, count = monitors.len(), "Fetched monitors");
        Ok(monitors)
    }

    async fn update_status(&self, update: &StatusUpdate) -> Result<(), CollaboratorError> {
        let request = self.client.post(format!("{}/status", self.base_url)).json(update);

        let response = self.authorize(request).send().await?;
        CollaboratorError::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonitorKind;
    use crate::monitoring::types::HealthStatus;
    use crate::test_support::serve_json;

    #[tokio::test]
    async fn test_list_monitors() {
        let body = r#"{
            "httpMonitors": [{"id": "h1", "url": "https://example.com", "periodicity": "1m"}],
            "tcpMonitors": [],
            "dnsMonitors": [{"id": "d1", "target": "example.com", "periodicity": "5m"}]
        }"#;
        let (url, mut requests) = serve_json(200, body).await;
        let orchestrator = HttpOrchestrator::new(url, Some("secret".to_string()), "eu-west").unwrap();

        let monitors = orchestrator.list_monitors().await.unwrap().into_monitors();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[1].kind, MonitorKind::Dns);

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("GET /monitors?region=eu-west HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_update_status_posts_json() {
        let (url, mut requests) = serve_json(200, "{}").await;
        let orchestrator = HttpOrchestrator::new(format!("{url}/"), None, "us-east").unwrap();

        let update = StatusUpdate {
            monitor_id: "m1".to_string(),
            region: "us-east".to_string(),
            status: HealthStatus::Error,
            status_code: None,
            latency: 12,
            message: Some("connection refused".to_string()),
            timestamp: 1,
            cron_timestamp: 1,
        };
        orchestrator.update_status(&update).await.unwrap();

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /status HTTP/1.1"));
        assert!(request.contains(r#""monitorId":"m1""#));
        assert!(request.contains(r#""status":"error""#));
    }

    #[tokio::test]
    async fn test_rejection_keeps_status_and_body() {
        let (url, _requests) = serve_json(503, r#"{"error":"busy"}"#).await;
        let orchestrator = HttpOrchestrator::new(url, None, "us-east").unwrap();

        let error = orchestrator.list_monitors().await.unwrap_err();
        assert!(matches!(
            error,
            CollaboratorError::Rejected { status: 503, ref body } if body.contains("busy")
        ));
    }
}
