use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::language_utils::describe_language;
use crate::providers::http::{build_client, check_status, parse_endpoint};
use crate::providers::{Capability, Provider, TranslationRequest};
use crate::translation::prompts;

/// OpenAI client for chat completions (also any compatible server)
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    /// Base URL, `/chat/completions` is appended
    endpoint: String,
    model: String,
    temperature: f32,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    /// Null when the model refused or called a tool
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl OpenAIRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl OpenAI {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ServiceError::AuthFailed("OpenAI requires an API key".to_string()));
        }
        Ok(Self {
            client: build_client(timeout),
            api_key,
            endpoint: endpoint.into(),
            model: model.into(),
            temperature,
        })
    }

    pub fn build_request(&self, request: &TranslationRequest) -> OpenAIRequest {
        let source = describe_language(&request.source_language);
        let target = describe_language(&request.target_language);
        OpenAIRequest::new(&self.model)
            .add_message("system", prompts::system_prompt(&source, &target))
            .add_message("user", prompts::batch_prompt(&request.texts, &request.hints, &source, &target))
            .temperature(self.temperature)
    }

    pub async fn complete(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ServiceError> {
        let mut url = parse_endpoint("OpenAI", &self.endpoint)?;
        url.set_path(&format!("{}/chat/completions", url.path().trim_end_matches('/')));

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        let response = check_status("OpenAI", response).await?;
        Ok(response.json::<OpenAIResponse>().await?)
    }

    pub fn extract_text_from_response(response: &OpenAIResponse) -> Option<&str> {
        response.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn capability(&self) -> Capability {
        Capability::AiContextAware
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError> {
        if request.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.complete(&self.build_request(request)).await?;
        if let Some(usage) = &response.usage {
            debug!(
                "OpenAI usage: {} prompt / {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        let text = Self::extract_text_from_response(&response)
            .ok_or_else(|| ServiceError::Malformed("OpenAI response has no message content".to_string()))?;
        prompts::parse_batch_response(text, request.len())
    }
}
