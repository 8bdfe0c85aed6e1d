use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{
    entities::{deliveries::DeliveryMetadataPayload, open_orders::OpenOrderGroup},
    errors::TransportError,
    repositories::{delivery_transport::DeliveryTransport, order_feed::OrderFeed},
    value_objects::{artifacts::ArtifactRef, business_key::BusinessKey},
};

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
const ARTIFACT_NAME_HEADER: &str = "X-Artifact-Name";

#[derive(Debug, Clone)]
pub struct DeliveryApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

/// Backend REST client: metadata, artifact uploads, reachability probe and the
/// open-orders feed.
pub struct DeliveryApiClient {
    client: Client,
    probe_client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtifactAck {
    #[serde(default)]
    accepted: Option<bool>,
}

impl DeliveryApiClient {
    pub fn new(config: DeliveryApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build delivery api client")?;
        let probe_client = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .context("failed to build delivery api probe client")?;

        Ok(Self {
            client,
            probe_client,
            base_url: config.base_url,
            token: config.token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::connection(format!("base url {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl DeliveryTransport for DeliveryApiClient {
    async fn submit_delivery_metadata(
        &self,
        payload: &DeliveryMetadataPayload,
    ) -> Result<(), TransportError> {
        let url = self.endpoint(&["deliveries"])?;
        let idempotency_key = format!("{}:{}", payload.order_id, payload.folio);

        let response = self
            .authorize(self.client.post(url))
            .header(IDEMPOTENCY_KEY_HEADER, &idempotency_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| map_send_error(err, "submit delivery metadata"))?;

        ensure_success(response, "submit delivery metadata").await?;
        debug!(idempotency_key = %idempotency_key, "delivery_api: metadata accepted");
        Ok(())
    }

    async fn upload_artifact(
        &self,
        key: &BusinessKey,
        artifact: &ArtifactRef,
    ) -> Result<bool, TransportError> {
        let bytes = tokio::fs::read(&artifact.path).await.map_err(|err| {
            TransportError::rejected(format!(
                "failed to read artifact {}: {err}",
                artifact.path.display()
            ))
        })?;
        let content_type = mime_guess::from_path(&artifact.path)
            .first_or_octet_stream()
            .to_string();
        let kind = artifact.kind.to_string();
        let url = self.endpoint(&["deliveries", &key.order_id, &key.folio, "artifacts", &kind])?;

        let response = self
            .authorize(self.client.post(url))
            .header(IDEMPOTENCY_KEY_HEADER, key.idempotency_key())
            .header(ARTIFACT_NAME_HEADER, &artifact.name)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| map_send_error(err, "upload artifact"))?;

        // The backend already holds this image from an earlier, unacknowledged attempt.
        if response.status() == StatusCode::CONFLICT {
            return Ok(true);
        }

        let response = ensure_success(response, "upload artifact").await?;
        let body = response.text().await.unwrap_or_default();
        let ack = if body.trim().is_empty() {
            ArtifactAck::default()
        } else {
            serde_json::from_str(&body).unwrap_or_default()
        };
        Ok(ack.accepted.unwrap_or(true))
    }

    async fn probe_health(&self) -> Result<(), TransportError> {
        let url = self.endpoint(&["health"])?;
        match self.authorize(self.probe_client.get(url)).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "delivery_api: backend reachable");
                Ok(())
            }
            Err(err) => Err(TransportError::connection(format!(
                "backend unreachable: {err}"
            ))),
        }
    }
}

#[async_trait]
impl OrderFeed for DeliveryApiClient {
    async fn fetch_open_orders(&self) -> Result<Vec<OpenOrderGroup>, TransportError> {
        let url = self.endpoint(&["open-orders"])?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|err| map_send_error(err, "fetch open orders"))?;

        let response = ensure_success(response, "fetch open orders").await?;
        response.json::<Vec<OpenOrderGroup>>().await.map_err(|err| {
            TransportError::rejected(format!("failed to decode open orders: {err}"))
        })
    }
}

fn map_send_error(err: reqwest::Error, action: &str) -> TransportError {
    match err.status() {
        Some(status) => TransportError::status(status.as_u16(), format!("failed to {action}: {err}")),
        None => TransportError::connection(format!("failed to {action}: {err}")),
    }
}

async fn ensure_success(response: Response, action: &str) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    // Keep a short preview of the response body for debugging.
    let preview = body.trim().chars().take(512).collect::<String>();
    warn!(
        status = status.as_u16(),
        action,
        body = %preview,
        "delivery_api: backend returned an error status"
    );

    let mut detail = format!("failed to {action} (status {})", status.as_u16());
    if !preview.is_empty() {
        detail.push_str(&format!("; body={preview}"));
    }
    Err(TransportError::status(status.as_u16(), detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> DeliveryApiClient {
        DeliveryApiClient::new(DeliveryApiConfig {
            base_url: Url::parse(base).unwrap(),
            token: None,
            timeout_secs: 5,
            probe_timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let api = client("https://api.example.com/v1/");
        let url = api
            .endpoint(&["deliveries", "PED 1", "F/2", "artifacts", "evidence"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/deliveries/PED%201/F%2F2/artifacts/evidence"
        );
    }

    #[test]
    fn endpoint_works_without_trailing_slash() {
        let api = client("https://api.example.com/v1");
        let url = api.endpoint(&["health"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/health");
    }

    #[tokio::test]
    async fn probe_reports_connection_failure_as_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(&format!("http://{addr}/"));
        let err = api.probe_health().await.unwrap_err();
        assert!(err.is_connection());
    }
}
