//! Indy REST client
//!
//! Thin wrapper over `reqwest` for the handful of admin, folo and promotion
//! endpoints a build cycle touches. Every request carries the JSON content
//! headers and, when the run is authenticated, the bearer token.

use crate::api::RepositoryApi;
use crate::context::RunContext;
use crate::error::IndyError;
use crate::promote::{GroupPromoteRequest, PathsPromoteRequest, PromoteResult};
use crate::store::{StoreDefinition, StoreKey};
use crate::tracking::TrackingReport;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use tracing::{debug, info};

const USER_AGENT: &str = concat!("indyperf/", env!("CARGO_PKG_VERSION"));

/// Longest response body excerpt kept in error messages.
const BODY_EXCERPT: usize = 512;

/// HTTP client for one repository service.
pub struct IndyClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl IndyClient {
    /// Create a client for the service described by `context`.
    pub fn new(context: &RunContext) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(auth) = context.authorization() {
            let mut value = HeaderValue::from_str(&auth).map_err(|_| {
                IndyError::SsoMisconfigured("token is not a valid header value".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .danger_accept_invalid_certs(!context.ssl_verify)
            .build()?;

        Ok(IndyClient {
            base_url: context.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Fail with `UnexpectedStatus` unless the response is 2xx.
async fn expect_success(method: &'static str, url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > BODY_EXCERPT {
        let mut cut = BODY_EXCERPT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    Err(IndyError::UnexpectedStatus {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RepositoryApi for IndyClient {
    async fn store_exists(&self, key: &StoreKey) -> Result<bool> {
        let url = self.url(&format!(
            "/api/admin/stores/{}/{}/{}",
            key.package_type, key.store_type, key.name
        ));
        let response = self.http_client.head(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => expect_success("HEAD", &url, response).await.map(|_| true),
        }
    }

    async fn create_store(&self, store: &StoreDefinition) -> Result<()> {
        let url = self.url(&format!(
            "/api/admin/stores/{}/{}",
            store.package_type, store.store_type
        ));
        debug!(key = %store.key, body = %serde_json::to_string(store)?, "Creating store");

        let response = self.http_client.post(&url).json(store).send().await?;
        expect_success("POST", &url, response).await?;
        info!(key = %store.key, "Created store");
        Ok(())
    }

    async fn seal_tracking_report(&self, tid: &str) -> Result<()> {
        let url = self.url(&format!("/api/folo/admin/{}/record", tid));
        let response = self.http_client.post(&url).send().await?;
        expect_success("POST", &url, response).await?;
        Ok(())
    }

    async fn fetch_tracking_report(&self, tid: &str) -> Result<TrackingReport> {
        let url = self.url(&format!("/api/folo/admin/{}/record", tid));
        let response = self.http_client.get(&url).send().await?;
        let response = expect_success("GET", &url, response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn promote_paths(&self, request: &PathsPromoteRequest) -> Result<PromoteResult> {
        let url = self.url("/api/promotion/paths/promote");
        let response = self.http_client.post(&url).json(request).send().await?;
        let response = expect_success("POST", &url, response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn promote_group(&self, request: &GroupPromoteRequest) -> Result<PromoteResult> {
        let url = self.url("/api/promotion/groups/promote");
        let response = self.http_client.post(&url).json(request).send().await?;
        let response = expect_success("POST", &url, response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn delete_group(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("/api/admin/group/{}", name));
        let response = self.http_client.delete(&url).send().await?;
        expect_success("DELETE", &url, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_without_token() {
        let client = IndyClient::new(&RunContext::anonymous("http://indy:8080/", true)).unwrap();
        assert_eq!(client.base_url(), "http://indy:8080");
        assert_eq!(
            client.url("/api/folo/admin/t/record"),
            "http://indy:8080/api/folo/admin/t/record"
        );
    }

    #[test]
    fn test_client_rejects_unprintable_token() {
        let ctx = RunContext::anonymous("http://indy", true).with_token("bad\ntoken");
        assert!(matches!(
            IndyClient::new(&ctx),
            Err(IndyError::SsoMisconfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        let client = IndyClient::new(&RunContext::anonymous("http://127.0.0.1:9", true)).unwrap();
        let result = client.store_exists(&StoreKey::hosted("builds")).await;
        assert!(matches!(result, Err(IndyError::Http(_))));
    }
}
