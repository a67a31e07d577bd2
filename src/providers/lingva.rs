use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::errors::ServiceError;
use crate::providers::http::{build_client, check_status, parse_endpoint, translate_each};
use crate::providers::{Capability, Provider, TranslationRequest};

/// Lingva client (Google Translate frontend, no key)
#[derive(Debug)]
pub struct Lingva {
    client: Client,
    endpoint: String,
    /// Pause between per-text calls
    request_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct LingvaResponse {
    translation: Option<String>,
}

impl Lingva {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, request_delay: Duration) -> Self {
        Self {
            client: build_client(timeout),
            endpoint: endpoint.into(),
            request_delay,
        }
    }

    /// `{endpoint}/api/v1/{source}/{target}/{text}` with every segment percent-encoded
    pub fn request_url(&self, text: &str, source: &str, target: &str) -> Result<Url, ServiceError> {
        let mut url = parse_endpoint(self.name(), &self.endpoint)?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::Unsupported(format!("Lingva URL cannot take a path: {}", self.endpoint)))?
            .pop_if_empty()
            .extend(["api", "v1", source, target, text]);
        Ok(url)
    }

    async fn translate_one(&self, text: &str, source: &str, target: &str) -> Result<String, ServiceError> {
        let url = self.request_url(text, source, target)?;
        let response = self.client.get(url).send().await?;
        let response = check_status(self.name(), response).await?;
        let body: LingvaResponse = response.json().await?;
        body.translation
            .ok_or_else(|| ServiceError::Malformed("Lingva response has no `translation` field".to_string()))
    }
}

#[async_trait]
impl Provider for Lingva {
    fn name(&self) -> &'static str {
        "lingva"
    }

    fn capability(&self) -> Capability {
        Capability::Free
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError> {
        let (source, target) = (request.source_language.as_str(), request.target_language.as_str());
        translate_each(self.name(), &request.texts, self.request_delay, |text| {
            self.translate_one(text, source, target)
        })
        .await
    }
}
