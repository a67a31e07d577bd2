use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::language_utils::primary_subtag;
use crate::providers::http::{build_client, check_status, parse_endpoint};
use crate::providers::{Capability, Provider, TranslationRequest};

/// DeepL client; `free` selects the DeepL Free API host
#[derive(Debug)]
pub struct DeepL {
    client: Client,
    api_key: String,
    endpoint: String,
    free: bool,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// DeepL target language code: upper case, with DeepL's own regional names
pub fn deepl_target_code(code: &str) -> String {
    let normalized = code.trim().replace('_', "-").to_lowercase();
    match normalized.as_str() {
        "en" => "EN".to_string(),
        "pt" => "PT-PT".to_string(),
        "pt-br" => "PT-BR".to_string(),
        "no" | "nb" => "NB".to_string(),
        other => other.to_uppercase(),
    }
}

/// DeepL source language code; sources never carry a region
pub fn deepl_source_code(code: &str) -> String {
    match primary_subtag(code).as_str() {
        "no" => "NB".to_string(),
        other => other.to_uppercase(),
    }
}

impl DeepL {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, free: bool, timeout: Duration) -> Result<Self, ServiceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ServiceError::AuthFailed("DeepL requires an API key".to_string()));
        }
        Ok(Self {
            client: build_client(timeout),
            api_key,
            endpoint: endpoint.into(),
            free,
        })
    }

    /// Form fields: one `text` per entry, then the language pair
    pub fn form_fields(&self, request: &TranslationRequest) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = request.texts.iter().map(|t| ("text", t.clone())).collect();
        fields.push(("source_lang", deepl_source_code(&request.source_language)));
        fields.push(("target_lang", deepl_target_code(&request.target_language)));
        fields
    }
}

#[async_trait]
impl Provider for DeepL {
    fn name(&self) -> &'static str {
        if self.free { "deepl-free" } else { "deepl" }
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError> {
        if request.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = parse_endpoint(self.name(), &self.endpoint)?;
        url.set_path(&format!("{}/v2/translate", url.path().trim_end_matches('/')));

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&self.form_fields(request))
            .send()
            .await?;
        let response = check_status(self.name(), response).await?;
        let body: DeepLResponse = response.json().await?;

        if body.translations.len() != request.len() {
            return Err(ServiceError::Malformed(format!(
                "DeepL returned {} translations for {} texts",
                body.translations.len(),
                request.len()
            )));
        }
        Ok(body.translations.into_iter().map(|t| t.text).collect())
    }
}
