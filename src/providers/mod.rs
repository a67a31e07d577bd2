/*!
 * Translation backends.
 *
 * Every backend implements [`Provider`]: it receives one batch of masked
 * texts for a single language pair and answers with translations aligned
 * 1:1 with the input, or with a [`ServiceError`] for the whole batch.
 *
 * - Free: Lingva, MyMemory, LibreTranslate (one HTTP call per text)
 * - Keyed: DeepL, DeepL Free, Google Cloud (one HTTP call per batch)
 * - AI-context-aware: OpenAI, Anthropic (one index-tagged prompt per batch)
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ServiceError;

/// What a backend needs and what it can make use of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Works without credentials
    Free,
    /// Needs an API key
    Keyed,
    /// Needs an API key and benefits from per-entry context hints
    AiContextAware,
}

/// One batch to translate
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslationRequest {
    /// Masked texts, in batch order
    pub texts: Vec<String>,
    /// Optional disambiguation context per text; only AI backends read it
    pub hints: Vec<Option<String>>,
    pub source_language: String,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(texts: Vec<String>, source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            texts,
            hints: Vec::new(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    pub fn with_hints(mut self, hints: Vec<Option<String>>) -> Self {
        self.hints = hints;
        self
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Common trait for all translation backends
///
/// Implementations hold no mutable shared state, so a batch may be sent
/// again after a failure without side effects.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short identifier used in logs and reports
    fn name(&self) -> &'static str;

    fn capability(&self) -> Capability;

    /// Translate a batch; the result has exactly one entry per input text
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError>;
}

pub mod http;
pub mod lingva;
pub mod mymemory;
pub mod libretranslate;
pub mod deepl;
pub mod google;
pub mod openai;
pub mod anthropic;
pub mod mock;
