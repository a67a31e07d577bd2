/*!
 * Mock provider for testing.
 *
 * The mock simulates the failure modes the pipeline has to survive:
 * - `MockProvider::working()` - always succeeds
 * - `MockProvider::failing(kind)` - every batch fails with the given error class
 * - `MockProvider::fail_first(n, kind)` - the first `n` calls fail, then it recovers
 * - `MockProvider::intermittent(n, kind)` - every `n`-th call fails
 * - `MockProvider::misaligned()` - answers with one translation too few
 * - `MockProvider::dropping_markers()` - loses `⟦N⟧` markers
 *
 * Translations are deterministic, so a rerun over the same catalog produces
 * identical output. Clones share the call counter and the request log.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{ServiceError, ServiceErrorKind};
use crate::providers::{Capability, Provider, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails
    Failing(ServiceErrorKind),
    /// The first `attempts` calls fail
    FailFirst { attempts: usize, kind: ServiceErrorKind },
    /// Every `fail_every`-th call fails
    Intermittent { fail_every: usize, kind: ServiceErrorKind },
    /// Returns one translation less than requested
    Misaligned,
    /// Strips every placeholder marker from the output
    DroppingMarkers,
}

/// Predicate deciding whether a particular batch fails
pub type FailWhen = fn(&TranslationRequest) -> bool;

/// Deterministic translation function: `(text, target_language) -> translation`
pub type Translator = fn(&str, &str) -> String;

fn default_translator(text: &str, target_language: &str) -> String {
    format!("[{}] {}", target_language, text)
}

/// Mock provider for testing pipeline behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Call counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<TranslationRequest>>>,
    translator: Translator,
    fail_when: Option<(FailWhen, ServiceErrorKind)>,
    delay: Option<Duration>,
    capability: Capability,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            translator: default_translator,
            fail_when: None,
            delay: None,
            capability: Capability::Free,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing(kind: ServiceErrorKind) -> Self {
        Self::new(MockBehavior::Failing(kind))
    }

    pub fn fail_first(attempts: usize, kind: ServiceErrorKind) -> Self {
        Self::new(MockBehavior::FailFirst { attempts, kind })
    }

    pub fn intermittent(fail_every: usize, kind: ServiceErrorKind) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
            kind,
        })
    }

    pub fn misaligned() -> Self {
        Self::new(MockBehavior::Misaligned)
    }

    pub fn dropping_markers() -> Self {
        Self::new(MockBehavior::DroppingMarkers)
    }

    /// Replace the default `[target] text` translation
    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    /// Fail every batch matching `predicate`, on every attempt
    pub fn with_fail_when(mut self, predicate: FailWhen, kind: ServiceErrorKind) -> Self {
        self.fail_when = Some((predicate, kind));
        self
    }

    /// Delay every call, to observe in-flight behavior
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Number of calls received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of all requests received so far
    pub fn requests(&self) -> Vec<TranslationRequest> {
        self.requests.lock().clone()
    }

    fn translate_all(&self, request: &TranslationRequest) -> Vec<String> {
        request
            .texts
            .iter()
            .map(|text| (self.translator)(text, &request.target_language))
            .collect()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<String>, ServiceError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((predicate, kind)) = self.fail_when {
            if predicate(request) {
                return Err(ServiceError::of_kind(kind, format!("Simulated failure for call #{}", call)));
            }
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.translate_all(request)),
            MockBehavior::Failing(kind) => Err(ServiceError::of_kind(kind, "Simulated provider failure")),
            MockBehavior::FailFirst { attempts, kind } => {
                if call <= attempts {
                    Err(ServiceError::of_kind(kind, format!("Simulated failure for call #{}", call)))
                } else {
                    Ok(self.translate_all(request))
                }
            }
            MockBehavior::Intermittent { fail_every, kind } => {
                if call % fail_every == 0 {
                    Err(ServiceError::of_kind(kind, format!("Simulated intermittent failure (call #{})", call)))
                } else {
                    Ok(self.translate_all(request))
                }
            }
            MockBehavior::Misaligned => {
                let mut translations = self.translate_all(request);
                translations.pop();
                Ok(translations)
            }
            MockBehavior::DroppingMarkers => Ok(self
                .translate_all(request)
                .into_iter()
                .map(|t| t.chars().filter(|c| *c != '⟦' && *c != '⟧' && !c.is_ascii_digit()).collect())
                .collect()),
        }
    }
}
