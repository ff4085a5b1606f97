//! Detail page fetching with per-record-type request shaping.

use std::sync::Arc;

use replycase_api::types::RecordType;
use replycase_api::{Client, Endpoints};

/// Typed failure of one detail fetch. Retry policy belongs to the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },
    #[error("cannot request detail: {0}")]
    Unsupported(String),
}

impl FetchError {
    /// Transport errors, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Unsupported(_) => false,
        }
    }
}

impl From<replycase_api::Error> for FetchError {
    fn from(e: replycase_api::Error) -> Self {
        match e {
            replycase_api::Error::RequestFailed(msg) => FetchError::Transport(msg),
            replycase_api::Error::Timeout => FetchError::Timeout,
            replycase_api::Error::HttpStatus { status, body } => FetchError::Status { status, body },
            other => FetchError::Unsupported(other.to_string()),
        }
    }
}

/// Fetches raw detail HTML over a shared connection-pooled client.
/// Cloning shares the client and the endpoint table.
#[derive(Clone)]
pub struct DetailFetcher {
    client: Client,
    endpoints: Arc<Endpoints>,
}

impl DetailFetcher {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints: Arc::new(endpoints),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Issues one POST for the record's detail page. Not retried here.
    pub async fn fetch(&self, record_id: i64, record_type: RecordType) -> Result<String, FetchError> {
        let endpoint = self.endpoints.detail(record_type);
        if endpoint.path.is_empty() || endpoint.id_param.is_empty() {
            return Err(FetchError::Unsupported(format!(
                "no detail endpoint configured for {}",
                record_type
            )));
        }
        let request = self.endpoints.detail_request(record_type, record_id);
        tracing::debug!("Fetching {} {} from {}", record_type, record_id, request.path);
        let html = self.client.get_detail(&request).await?;
        Ok(html)
    }
}
