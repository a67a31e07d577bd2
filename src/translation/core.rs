/*!
 * Backend selection.
 *
 * `TranslationService` is the closed set of supported backends. It is built
 * once from the configuration and then used through the [`Provider`] trait,
 * so the pipeline never dispatches on backend names.
 */

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ServiceError;
use crate::providers::anthropic::Anthropic;
use crate::providers::deepl::DeepL;
use crate::providers::google::Google;
use crate::providers::libretranslate::LibreTranslate;
use crate::providers::lingva::Lingva;
use crate::providers::mymemory::MyMemory;
use crate::providers::openai::OpenAI;
use crate::providers::{Capability, Provider, TranslationRequest};

/// The configured translation backend
#[derive(Debug)]
pub enum TranslationService {
    Lingva(Lingva),
    MyMemory(MyMemory),
    LibreTranslate(LibreTranslate),
    /// DeepL Pro and DeepL Free share a client
    DeepL(DeepL),
    Google(Google),
    OpenAI(OpenAI),
    Anthropic(Anthropic),
}

impl TranslationService {
    /// Create the backend selected in `config`; keyed backends fail without a key
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        let provider = config.provider;
        let endpoint = config.get_endpoint();
        let api_key = config.get_api_key();
        let timeout = Duration::from_secs(config.get_timeout_secs());
        let request_delay = Duration::from_millis(config.common.request_delay_ms);
        let optional_key = Some(api_key.clone()).filter(|k| !k.is_empty());

        debug!("Creating {} client for {}", provider.display_name(), endpoint);

        let service = match provider {
            TranslationProvider::Lingva => Self::Lingva(Lingva::new(endpoint, timeout, request_delay)),
            TranslationProvider::MyMemory => {
                Self::MyMemory(MyMemory::new(endpoint, config.get_email(), timeout, request_delay))
            }
            TranslationProvider::LibreTranslate => {
                Self::LibreTranslate(LibreTranslate::new(endpoint, optional_key, timeout, request_delay))
            }
            TranslationProvider::DeepL | TranslationProvider::DeepLFree => Self::DeepL(
                DeepL::new(api_key, endpoint, provider == TranslationProvider::DeepLFree, timeout)
                    .map_err(|e| anyhow!("{}", e))?,
            ),
            TranslationProvider::Google => {
                Self::Google(Google::new(api_key, endpoint, timeout).map_err(|e| anyhow!("{}", e))?)
            }
            TranslationProvider::OpenAI => Self::OpenAI(
                OpenAI::new(api_key, endpoint, config.get_model(), config.common.temperature, timeout)
                    .map_err(|e| anyhow!("{}", e))?,
            ),
            TranslationProvider::Anthropic => Self::Anthropic(
                Anthropic::new(
                    api_key,
                    endpoint,
                    config.get_model(),
                    config.common.temperature,
                    config.common.max_tokens,
                    timeout,
                )
                .map_err(|e| anyhow!("{}", e))?,
            ),
        };
        Ok(service)
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            Self::Lingva(p) => p,
            Self::MyMemory(p) => p,
            Self::LibreTranslate(p) => p,
            Self::DeepL(p) => p,
            Self::Google(p) => p,
            Self::OpenAI(p) => p,
            Self::Anthropic(p) => p,
        }
    }
}

#[async_trait]
impl Provider for TranslationService {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn capability(&self) -> Capability {
        self.inner().capability()
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError> {
        self.inner().translate(request).await
    }
}
