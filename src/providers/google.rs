use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::providers::http::{build_client, check_status, parse_endpoint};
use crate::providers::{Capability, Provider, TranslationRequest};

/// Google Cloud Translation (v2, API key) client
#[derive(Debug)]
pub struct Google {
    client: Client,
    api_key: String,
    endpoint: String,
}

/// Google Cloud Translation request body
#[derive(Debug, Serialize)]
pub struct GoogleRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}

impl Google {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ServiceError::AuthFailed("Google Cloud Translation requires an API key".to_string()));
        }
        Ok(Self {
            client: build_client(timeout),
            api_key,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Provider for Google {
    fn name(&self) -> &'static str {
        "google"
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError> {
        if request.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = parse_endpoint(self.name(), &self.endpoint)?;
        url.set_path(&format!("{}/language/translate/v2", url.path().trim_end_matches('/')));
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let body = GoogleRequest {
            q: &request.texts,
            source: &request.source_language,
            target: &request.target_language,
            format: "text",
        };
        let response = self.client.post(url).json(&body).send().await?;
        let response = check_status(self.name(), response).await?;
        let parsed: GoogleResponse = response.json().await?;

        let translations = parsed.data.translations;
        if translations.len() != request.len() {
            return Err(ServiceError::Malformed(format!(
                "Google returned {} translations for {} texts",
                translations.len(),
                request.len()
            )));
        }
        Ok(translations.into_iter().map(|t| t.translated_text).collect())
    }
}
