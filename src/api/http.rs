use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::identity::SessionIdentity;
use crate::models::{
    CardInfo, CreateLocationRequest, CreateLocationResponse, LocationRecord, MessageResponse,
    RecordingWindow,
};

use super::{ApiError, ErrorBody, LocationsApi};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Header carrying the anonymous session identity on writes.
pub const SESSION_HEADER: &str = "X-Session-Id";

#[derive(Clone)]
pub struct HttpLocationsApi {
    client: Client,
    base_url: String,
}

impl HttpLocationsApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|err| {
            log_warn!("request failed before a response arrived: {err}");
            ApiError::Network(err.to_string())
        })?;

        let status = response.status();
        let url = response.url().to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        log_debug!("{} {} ({} bytes)", status.as_u16(), url, bytes.len());

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: ErrorBody::from_bytes(&bytes),
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            log_warn!("malformed response from {url}: {err}");
            ApiError::Unknown
        })
    }
}

#[async_trait]
impl LocationsApi for HttpLocationsApi {
    async fn fetch_locations(&self) -> Result<Vec<LocationRecord>, ApiError> {
        self.send(self.client.get(self.url("/api/locations"))).await
    }

    async fn fetch_recording_window(&self) -> Result<RecordingWindow, ApiError> {
        self.send(self.client.get(self.url("/api/recording-status")))
            .await
    }

    async fn create_location(
        &self,
        request: &CreateLocationRequest,
        identity: &SessionIdentity,
    ) -> Result<CreateLocationResponse, ApiError> {
        let body = serde_json::to_vec(request).map_err(|_| ApiError::Unknown)?;
        let builder = self
            .client
            .post(self.url("/api/record-location"))
            .header(CONTENT_TYPE, "application/json")
            .header(SESSION_HEADER, identity.as_str())
            .body(body);
        self.send(builder).await
    }

    async fn delete_location(
        &self,
        id: i64,
        identity: &SessionIdentity,
    ) -> Result<MessageResponse, ApiError> {
        let builder = self
            .client
            .delete(self.url(&format!("/api/locations/{id}")))
            .header(SESSION_HEADER, identity.as_str());
        self.send(builder).await
    }

    async fn fetch_card_info(&self) -> Result<CardInfo, ApiError> {
        self.send(self.client.get(self.url("/api/card-info"))).await
    }
}
