use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::errors::ServiceError;
use crate::providers::http::{build_client, check_status, parse_endpoint, translate_each};
use crate::providers::{Capability, Provider, TranslationRequest};

/// MyMemory client (free tier, optional contact e-mail for a larger quota)
#[derive(Debug)]
pub struct MyMemory {
    client: Client,
    endpoint: String,
    email: Option<String>,
    request_delay: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    /// A number on success, sometimes a string on errors
    response_status: Value,
    #[serde(default)]
    response_details: Option<String>,
    response_data: Option<MyMemoryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: Option<String>,
}

impl MyMemory {
    pub fn new(endpoint: impl Into<String>, email: Option<String>, timeout: Duration, request_delay: Duration) -> Self {
        Self {
            client: build_client(timeout),
            endpoint: endpoint.into(),
            email: email.filter(|e| !e.trim().is_empty()),
            request_delay,
        }
    }

    /// `{endpoint}/get?q=..&langpair=src|tgt[&de=email]`
    pub fn request_url(&self, text: &str, source: &str, target: &str) -> Result<Url, ServiceError> {
        let mut url = parse_endpoint(self.name(), &self.endpoint)?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::Unsupported(format!("MyMemory URL cannot take a path: {}", self.endpoint)))?
            .pop_if_empty()
            .push("get");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("q", text);
            query.append_pair("langpair", &format!("{}|{}", source, target));
            if let Some(email) = &self.email {
                query.append_pair("de", email);
            }
        }
        Ok(url)
    }

    async fn translate_one(&self, text: &str, source: &str, target: &str) -> Result<String, ServiceError> {
        let url = self.request_url(text, source, target)?;
        let response = self.client.get(url).send().await?;
        let response = check_status(self.name(), response).await?;
        let body: MyMemoryResponse = response.json().await?;

        let status = match &body.response_status {
            Value::Number(n) => n.as_u64().unwrap_or_default() as u16,
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        };
        if status != 200 {
            let details = body.response_details.unwrap_or_default();
            warn!("MyMemory refused the request ({}): {}", status, details);
            return Err(ServiceError::from_status(status, details));
        }
        body.response_data
            .and_then(|d| d.translated_text)
            .ok_or_else(|| ServiceError::Malformed("MyMemory response has no translatedText".to_string()))
    }
}

#[async_trait]
impl Provider for MyMemory {
    fn name(&self) -> &'static str {
        "mymemory"
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
