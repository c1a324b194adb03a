//! REST transport to the tour backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Tour, TourId, TourSummary},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        CreateTourRequest, CreatedLocation, NewLocation, SearchResponse, SearchResult,
        TourMembershipRequest,
    },
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid backend url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} rejected the request: {source}")]
    Api {
        endpoint: &'static str,
        #[source]
        source: ApiException,
    },
    #[error("unexpected response body from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    pub fn api(endpoint: &'static str, error: ApiError) -> Self {
        Self::Api {
            endpoint,
            source: error.into(),
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { source, .. } => Some(source.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.error_code() == Some(ErrorCode::NotFound)
    }
}

/// The backend calls the session controller depends on. One method per
/// endpoint; implementations never retry.
#[async_trait]
pub trait TourBackend: Send + Sync {
    async fn list_tours(&self) -> Result<Vec<TourSummary>, TransportError>;
    async fn get_tour(&self, tour_id: TourId) -> Result<Tour, TransportError>;
    async fn create_tour(&self, request: &CreateTourRequest)
        -> Result<TourSummary, TransportError>;
    async fn delete_tour(&self, tour_id: TourId) -> Result<(), TransportError>;
    async fn search_locations(&self, query: &str) -> Result<Vec<SearchResult>, TransportError>;
    async fn create_location(
        &self,
        location: &NewLocation,
    ) -> Result<CreatedLocation, TransportError>;
    async fn add_to_tour(&self, membership: TourMembershipRequest) -> Result<(), TransportError>;
    async fn remove_from_tour(
        &self,
        membership: TourMembershipRequest,
    ) -> Result<(), TransportError>;
}

pub struct HttpTourBackend {
    http: Client,
    base: Url,
}

impl HttpTourBackend {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(TransportError::Client)?;
        Self::with_client(&settings.api_base_url, http)
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, TransportError> {
        let base = Url::parse(base_url.trim()).map_err(|e| TransportError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(TransportError::BaseUrl {
                url: base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}/api/{segments..}/`. Each segment is percent-encoded on
    /// its own, so a `/` inside a search query stays inside its segment.
    pub fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.push("api");
            path.extend(segments);
            path.push("");
        }
        url
    }

    async fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request { endpoint, source })?;
        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "backend responded");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::api(
            endpoint,
            ApiError::from_status(status.as_u16(), body),
        ))
    }

    async fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        response: Response,
    ) -> Result<T, TransportError> {
        response
            .json::<T>()
            .await
            .map_err(|source| TransportError::Decode { endpoint, source })
    }
}

#[async_trait]
impl TourBackend for HttpTourBackend {
    async fn list_tours(&self) -> Result<Vec<TourSummary>, TransportError> {
        let endpoint = "list_tours";
        let url = self.endpoint_url(&["tours"]);
        let response = self.send(endpoint, self.http.get(url)).await?;
        Self::decode(endpoint, response).await
    }

    async fn get_tour(&self, tour_id: TourId) -> Result<Tour, TransportError> {
        let endpoint = "get_tour";
        let url = self.endpoint_url(&["get_tour", &tour_id.to_string()]);
        let response = self.send(endpoint, self.http.get(url)).await?;
        Self::decode(endpoint, response).await
    }

    async fn create_tour(
        &self,
        request: &CreateTourRequest,
    ) -> Result<TourSummary, TransportError> {
        let endpoint = "create_tour";
        let url = self.endpoint_url(&["create_tour"]);
        let response = self.send(endpoint, self.http.post(url).json(request)).await?;
        Self::decode(endpoint, response).await
    }

    async fn delete_tour(&self, tour_id: TourId) -> Result<(), TransportError> {
        let url = self.endpoint_url(&["delete_tour", &tour_id.to_string()]);
        self.send("delete_tour", self.http.delete(url)).await?;
        Ok(())
    }

    async fn search_locations(&self, query: &str) -> Result<Vec<SearchResult>, TransportError> {
        let endpoint = "search";
        let url = self.endpoint_url(&["search", query]);
        let response = self.send(endpoint, self.http.get(url)).await?;
        let body: SearchResponse = Self::decode(endpoint, response).await?;
        Ok(body.data)
    }

    async fn create_location(
        &self,
        location: &NewLocation,
    ) -> Result<CreatedLocation, TransportError> {
        let endpoint = "add_location";
        let url = self.endpoint_url(&["add_location"]);
        let response = self
            .send(endpoint, self.http.post(url).json(location))
            .await?;
        Self::decode(endpoint, response).await
    }

    async fn add_to_tour(&self, membership: TourMembershipRequest) -> Result<(), TransportError> {
        let url = self.endpoint_url(&["add_to_tour"]);
        self.send("add_to_tour", self.http.post(url).json(&membership))
            .await?;
        Ok(())
    }

    async fn remove_from_tour(
        &self,
        membership: TourMembershipRequest,
    ) -> Result<(), TransportError> {
        let url = self.endpoint_url(&["remove_from_tour"]);
        self.send("remove_from_tour", self.http.post(url).json(&membership))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
