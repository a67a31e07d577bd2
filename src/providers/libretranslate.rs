use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::providers::http::{build_client, check_status, parse_endpoint, translate_each};
use crate::providers::{Capability, Provider, TranslationRequest};

/// LibreTranslate client, public instance or self-hosted
#[derive(Debug)]
pub struct LibreTranslate {
    client: Client,
    endpoint: String,
    /// Some instances require a key, most self-hosted ones do not
    api_key: Option<String>,
    request_delay: Duration,
}

/// LibreTranslate request body
#[derive(Debug, Serialize)]
pub struct LibreTranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreTranslateResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

impl LibreTranslate {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration, request_delay: Duration) -> Self {
        Self {
            client: build_client(timeout),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            request_delay,
        }
    }

    pub fn request_body<'a>(&'a self, text: &'a str, source: &'a str, target: &'a str) -> LibreTranslateRequest<'a> {
        LibreTranslateRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        }
    }

    async fn translate_one(&self, text: &str, source: &str, target: &str) -> Result<String, ServiceError> {
        let mut url = parse_endpoint(self.name(), &self.endpoint)?;
        url.set_path(&format!("{}/translate", url.path().trim_end_matches('/')));

        let response = self
            .client
            .post(url)
            .json(&self.request_body(text, source, target))
            .send()
            .await?;
        let response = check_status(self.name(), response).await?;
        let body: LibreTranslateResponse = response.json().await?;
        match (body.translated_text, body.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(ServiceError::Unsupported(error)),
            (None, None) => Err(ServiceError::Malformed(
                "LibreTranslate response has no translatedText".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Provider for LibreTranslate {
    fn name(&self) -> &'static str {
        "libretranslate"
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
