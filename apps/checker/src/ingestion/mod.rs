pub mod client;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::monitoring::types::ResultRecord;

pub use client::HttpIngestion;

/// Analytics sink for result records
#[async_trait]
pub trait Ingestion: Send + Sync {
    async fn send_event(&self, record: &ResultRecord, datasource: &str) -> Result<(), CollaboratorError>;
}
