//! HTTP operation handler
//!
//! Posts an operation to `{base_url}/operations/{operation_type}` with the
//! item's idempotency key in the `Idempotency-Key` header, and maps the
//! response status onto the dispatch taxonomy:
//!
//! | status                    | outcome                         |
//! |---------------------------|---------------------------------|
//! | 2xx (except 208)          | `Applied`                       |
//! | 208, 409                  | already applied                 |
//! | 412 with version body     | `Conflict`                      |
//! | 408, 429, 5xx             | transient                       |
//! | 400, 422                  | `InvalidPayload` (permanent)    |
//! | other 4xx                 | `Rejected` (permanent)          |

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use brewops_core::{DispatchOutcome, OperationHandler, SyncError};
use brewops_domain::{BrewOpsError, OperationPayload, OperationScope, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::InfraError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const MAX_BODY_EXCERPT: usize = 200;

/// Configuration for the HTTP handler
#[derive(Debug, Clone)]
pub struct HttpHandlerConfig {
    /// Base URL of the remote API, e.g. `https://api.example.com/v1`
    pub base_url: String,
    /// Per-request timeout enforced by the transport
    pub timeout: Duration,
    pub bearer_token: Option<String>,
}

impl HttpHandlerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), timeout: Duration::from_secs(30), bearer_token: None }
    }
}

#[derive(Serialize)]
struct OperationRequest<'a, P> {
    workspace_id: &'a str,
    user_id: &'a str,
    payload: &'a P,
}

#[derive(Deserialize)]
struct ConflictBody {
    local_version: u64,
    remote_version: u64,
}

/// Applies one operation kind over HTTP
pub struct HttpOperationHandler<P> {
    client: Client,
    endpoint: String,
    timeout: Duration,
    bearer_token: Option<String>,
    _payload: PhantomData<fn(P)>,
}

impl<P: OperationPayload> HttpOperationHandler<P> {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: HttpHandlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| BrewOpsError::from(InfraError::from(err)))?;
        let endpoint =
            format!("{}/operations/{}", config.base_url.trim_end_matches('/'), P::KIND);

        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout,
            bearer_token: config.bearer_token,
            _payload: PhantomData,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: &reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout)
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl<P: OperationPayload> OperationHandler for HttpOperationHandler<P> {
    type Payload = P;

    #[instrument(skip(self, payload, scope), fields(endpoint = %self.endpoint))]
    async fn apply(
        &self,
        payload: P,
        idempotency_key: &str,
        scope: &OperationScope,
    ) -> std::result::Result<DispatchOutcome, SyncError> {
        let body = OperationRequest {
            workspace_id: &scope.workspace_id,
            user_id: &scope.user_id,
            payload: &payload,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
            .json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| self.transport_error(&err))?;
        let status = response.status();
        debug!(%status, "Received operation response");

        if status.is_success() && status != StatusCode::ALREADY_REPORTED {
            return Ok(DispatchOutcome::Applied);
        }

        let text = response.text().await.unwrap_or_default();
        classify_status(status, &text)
    }
}

/// Map a non-applied response onto the dispatch taxonomy.
fn classify_status(
    status: StatusCode,
    body: &str,
) -> std::result::Result<DispatchOutcome, SyncError> {
    let detail = excerpt(status, body);
    match status {
        StatusCode::ALREADY_REPORTED | StatusCode::CONFLICT => Ok(DispatchOutcome::AlreadyApplied),
        StatusCode::PRECONDITION_FAILED => match serde_json::from_str::<ConflictBody>(body) {
            Ok(conflict) => Err(SyncError::Conflict {
                local_version: conflict.local_version,
                remote_version: conflict.remote_version,
            }),
            Err(_) => Err(SyncError::Rejected(detail)),
        },
        StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimit(detail)),
        StatusCode::SERVICE_UNAVAILABLE => Err(SyncError::Unavailable(detail)),
        StatusCode::REQUEST_TIMEOUT => Err(SyncError::Server(detail)),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(SyncError::InvalidPayload(detail))
        }
        s if s.is_server_error() => Err(SyncError::Server(detail)),
        s if s.is_success() => Ok(DispatchOutcome::Applied),
        _ => Err(SyncError::Rejected(detail)),
    }
}

fn excerpt(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.to_string();
    }
    let snippet: String = body.chars().take(MAX_BODY_EXCERPT).collect();
    format!("{status}: {snippet}")
}
