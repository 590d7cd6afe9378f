use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::types::{ChatReply, ChatRequest, ErrorBody, PointsEnvelope, PointsReply, PointsRequest};
use super::{ChatService, PointsService};
use crate::config::{RequestConfig, ServiceConfig};
use crate::error::{RemoteError, RemoteResult};

/// Shared HTTP plumbing: API key header, timeout, and error normalization.
///
/// Every call is a single attempt.
#[derive(Clone)]
pub(crate) struct HttpTransport {
    client: Client,
    api_key: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub(crate) fn new(api_key: &str, request_config: &RequestConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(|e| RemoteError::Unknown {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> RemoteResult<T> {
        self.execute(self.client.get(url), url).await
    }

    pub(crate) async fn post_json<B, T>(&self, url: &str, body: &B) -> RemoteResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.execute(self.client.post(url).json(body), url).await
    }

    /// POST without a request body.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, url: &str) -> RemoteResult<T> {
        self.execute(self.client.post(url), url).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> RemoteResult<T> {
        debug!(url = %url, "Calling remote service");
        let start = Instant::now();

        let result = self.send(request).await;
        let latency = start.elapsed();

        match &result {
            Ok(_) => info!(
                url = %url,
                latency_ms = latency.as_millis(),
                "Remote call succeeded"
            ),
            Err(e) => error!(
                url = %url,
                error = %e,
                kind = ?e.kind(),
                latency_ms = latency.as_millis(),
                "Remote call failed"
            ),
        }

        result
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| RemoteError::from_transport(e, self.timeout_ms))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(
                status.as_u16(),
                ErrorBody::extract(&error_body),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                RemoteError::Unknown {
                    message: format!("Failed to parse response: {}", e),
                }
            }
        })
    }
}

/// Client for the Nandi chat generation and points services
#[derive(Clone)]
pub struct NandiClient {
    transport: HttpTransport,
    ai_service_url: String,
    api_service_url: String,
}

impl NandiClient {
    /// Create a new client
    pub fn new(config: &ServiceConfig, request_config: RequestConfig) -> RemoteResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(&config.api_key, &request_config)?,
            ai_service_url: config.ai_service_url.trim_end_matches('/').to_string(),
            api_service_url: config.api_service_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the chat service base URL (for testing)
    pub fn ai_service_url(&self) -> &str {
        &self.ai_service_url
    }

    /// Get the points service base URL (for testing)
    pub fn api_service_url(&self) -> &str {
        &self.api_service_url
    }
}

#[async_trait]
impl ChatService for NandiClient {
    async fn generate_reply(&self, request: &ChatRequest) -> RemoteResult<ChatReply> {
        let url = format!("{}/api/chat/generate", self.ai_service_url);
        debug!(
            persona = %request.persona,
            session_id = %request.session_id,
            context = request.context.len(),
            "Requesting chat reply"
        );
        self.transport.post_json(&url, request).await
    }
}

#[async_trait]
impl PointsService for NandiClient {
    async fn calculate_points(&self, request: &PointsRequest) -> RemoteResult<PointsReply> {
        let url = format!("{}/api/points/calculate", self.api_service_url);
        let envelope: PointsEnvelope = self.transport.post_json(&url, request).await?;
        Ok(envelope.into())
    }
}
