//! Client for the sibling feed-ranking provider service.
//!
//! Every call carries the shared static key in the `x-api-key` header.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::config::ProviderConfig;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid provider base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider responded with status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ShowcaseResponse {
    providers: Vec<ProviderSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealResponse {
    post_doc_paths: Vec<String>,
}

#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|_| ProviderError::InvalidBaseUrl(config.base_url.clone()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProviderError::InvalidBaseUrl(config.base_url.clone()));
        }
        // Endpoints are joined relative to the base, so its path must end in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ProviderError::InvalidBaseUrl(format!("{}{}", self.base_url, path)))
    }

    pub async fn showcase(&self) -> Result<Vec<ProviderSummary>, ProviderError> {
        let response = self
            .http
            .get(self.endpoint("client/showcase")?)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let body: ShowcaseResponse = check(response)?.json().await?;
        Ok(body.providers)
    }

    /// Ordered post paths the provider suggests for `username`
    pub async fn deal(&self, provider: &str, username: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("client/deal")?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "provider": provider, "username": username }))
            .send()
            .await?;

        let body: DealResponse = check(response)?.json().await?;
        Ok(body.post_doc_paths)
    }

    pub async fn rate(&self, provider: &str, username: &str, score: u8) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.endpoint("client/rate")?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "provider": provider, "username": username, "score": score }))
            .send()
            .await?;

        check(response)?;
        Ok(())
    }
}

fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Status(status.as_u16()))
    }
}
