/*!
 * Translation pipeline.
 *
 * One catalog file moves through these stages:
 *
 * Load → Select → Mask → Batch → Dispatch (attempt, retry, give up) →
 * Unmask → Glossary → Merge → Report or Write
 *
 * Glossary terms are masked together with placeholders and get their target
 * term when unmasked; every other token is restored verbatim.
 *
 * Batches are dispatched in build order (optionally several in flight) and
 * merged strictly in that order; the merge step is the only place where the
 * catalog changes. A failing batch never stops the run: its units stay
 * untouched and are reported with the reason. Cancellation stops new batches
 * while the ones already in flight complete and are merged.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use rand::Rng;

use crate::app_config::Config;
use crate::catalog::{Catalog, CatalogFormat};
use crate::errors::{ServiceError, ServiceErrorKind};
use crate::file_utils::FileManager;
use crate::providers::{Capability, Provider, TranslationRequest};
use crate::translation::batch::Batcher;
use crate::translation::formatting::{Padding, match_line_endings, strip_added_quotes};
use crate::translation::glossary::Glossary;
use crate::translation::placeholders::{PlaceholderGuard, PlaceholderToken, is_placeholder_only};

/// Knobs of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub source_language: String,
    pub target_language: String,
    /// Units per batch
    pub batch_size: usize,
    /// Leave fuzzy units alone
    pub skip_fuzzy: bool,
    /// Report diffs instead of writing
    pub dry_run: bool,
    /// Extra attempts for rate-limited or network-failed batches
    pub retry_count: u32,
    /// Base backoff, doubled on each retry
    pub retry_backoff_ms: u64,
    /// Pause before every batch but the first
    pub rate_limit_delay_ms: u64,
    /// Batches in flight at once
    pub concurrent_requests: usize,
    /// Write merged results even when the run was interrupted
    pub write_on_interrupt: bool,
}

impl PipelineOptions {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            batch_size: crate::translation::batch::DEFAULT_BATCH_SIZE,
            skip_fuzzy: false,
            dry_run: false,
            retry_count: 3,
            retry_backoff_ms: 1000,
            rate_limit_delay_ms: 500,
            concurrent_requests: 1,
            write_on_interrupt: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let common = &config.translation.common;
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            batch_size: config.run.batch_size,
            skip_fuzzy: config.run.skip_fuzzy,
            dry_run: config.run.dry_run,
            retry_count: common.retry_count,
            retry_backoff_ms: common.retry_backoff_ms,
            rate_limit_delay_ms: common.rate_limit_delay_ms,
            concurrent_requests: common.concurrent_requests.max(1),
            write_on_interrupt: config.run.write_on_interrupt,
        }
    }

    /// Options without waiting, for tests and local backends
    pub fn without_delays(mut self) -> Self {
        self.retry_backoff_ms = 0;
        self.rate_limit_delay_ms = 0;
        self
    }
}

/// Stage of the pipeline, used to label file-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Select,
    Mask,
    Batch,
    Dispatch,
    Unmask,
    Glossary,
    Merge,
    Report,
    Write,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Select => "select",
            Self::Mask => "mask",
            Self::Batch => "batch",
            Self::Dispatch => "dispatch",
            Self::Unmask => "unmask",
            Self::Glossary => "glossary",
            Self::Merge => "merge",
            Self::Report => "report",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Why a selected unit did not get a translation
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The unit's batch failed for good
    Service { kind: ServiceErrorKind, message: String },
    /// The backend answered with an empty string
    EmptyTranslation,
    /// The run was interrupted before the unit's batch was sent
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service { kind, message } => write!(f, "{}: {}", kind, message),
            Self::EmptyTranslation => f.write_str("empty translation"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A selected unit left untranslated
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    /// Index into `Catalog::units`
    pub index: usize,
    pub source_text: String,
    pub reason: FailureReason,
}

/// A unit translated with a caveat (placeholder fallback)
#[derive(Debug, Clone, PartialEq)]
pub struct UnitWarning {
    pub index: usize,
    pub source_text: String,
    pub message: String,
}

/// Before/after view of one changed or failed unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDiff {
    pub index: usize,
    pub context: Option<String>,
    pub source_text: String,
    pub before: String,
    pub after: String,
    pub fuzzy_before: bool,
    pub fuzzy_after: bool,
    /// Set when the unit stayed untranslated; `after` then equals `before`
    pub failure: Option<FailureReason>,
}

/// What happened to the file on disk
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Changes were written
    Written,
    /// Nothing changed, the file was left alone
    Unchanged,
    /// Dry run, nothing written
    DryRun,
    /// Interrupted and not configured to write partial results
    Interrupted,
    /// A file-level failure; the file is untouched
    Failed { stage: PipelineStage, message: String },
}

/// Result of translating one catalog
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: Option<PathBuf>,
    pub format: Option<CatalogFormat>,
    pub total_units: usize,
    /// Units eligible for translation
    pub selected: usize,
    /// Units that received a translation (including placeholder fallbacks)
    pub translated: usize,
    /// Units made only of placeholders, copied without a backend call
    pub copied: usize,
    /// Units not selected (already translated, blank, or fuzzy with skip-fuzzy)
    pub skipped: usize,
    pub batches: usize,
    pub failures: Vec<UnitFailure>,
    pub warnings: Vec<UnitWarning>,
    /// Filled on dry runs
    pub diffs: Vec<UnitDiff>,
    pub cancelled: bool,
    pub status: FileStatus,
}

impl FileReport {
    fn empty(path: Option<PathBuf>) -> Self {
        Self {
            path,
            format: None,
            total_units: 0,
            selected: 0,
            translated: 0,
            copied: 0,
            skipped: 0,
            batches: 0,
            failures: Vec::new(),
            warnings: Vec::new(),
            diffs: Vec::new(),
            cancelled: false,
            status: FileStatus::Unchanged,
        }
    }

    fn failed(path: &Path, stage: PipelineStage, message: String) -> Self {
        Self {
            status: FileStatus::Failed { stage, message },
            ..Self::empty(Some(path.to_path_buf()))
        }
    }

    /// Units that stayed untranslated because of a backend failure
    pub fn failed_units(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| !matches!(f.reason, FailureReason::Cancelled))
            .count()
    }

    /// Whether the file ended with nothing left undone through failure
    pub fn is_success(&self) -> bool {
        !matches!(self.status, FileStatus::Failed { .. }) && self.failed_units() == 0
    }
}

/// Work prepared for one selected unit
#[derive(Debug)]
struct PendingUnit {
    index: usize,
    /// Source without surrounding whitespace
    core: String,
    padding: Padding,
    masked: String,
    /// Tokens to unmask with, glossary terms already swapped for their targets
    restore: Vec<PlaceholderToken>,
    hint: Option<String>,
}

enum BatchOutcome {
    Translated(Vec<String>),
    Failed(ServiceError),
    Cancelled,
}

/// Translates catalogs with one backend
pub struct Pipeline<'a> {
    provider: &'a dyn Provider,
    guard: PlaceholderGuard,
    glossary: Option<Glossary>,
    options: PipelineOptions,
    cancel: Arc<AtomicBool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn Provider, options: PipelineOptions) -> Self {
        Self {
            provider,
            guard: PlaceholderGuard::default(),
            glossary: None,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_guard(mut self, guard: PlaceholderGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_glossary(mut self, glossary: Option<Glossary>) -> Self {
        self.glossary = glossary.filter(|g| !g.is_empty());
        self
    }

    /// Share a cancellation flag, typically set from a Ctrl-C handler
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Load, translate and write (or dry-run report) one catalog file
    pub async fn process_file<F>(&self, path: &Path, progress: F) -> FileReport
    where
        F: Fn(usize, usize),
    {
        let Some(format) = CatalogFormat::from_path(path) else {
            return FileReport::failed(path, PipelineStage::Load, "unsupported file extension".to_string());
        };
        let bytes = match FileManager::read_bytes(path) {
            Ok(bytes) => bytes,
            Err(e) => return FileReport::failed(path, PipelineStage::Load, format!("{:#}", e)),
        };
        let mut catalog = match Catalog::parse(format, &bytes) {
            Ok(catalog) => catalog,
            Err(e) => return FileReport::failed(path, PipelineStage::Load, e.to_string()),
        };

        let mut report = self.translate_catalog(&mut catalog, progress).await;
        report.path = Some(path.to_path_buf());

        if report.status == FileStatus::DryRun || report.status == FileStatus::Unchanged {
            return report;
        }
        if report.cancelled && !self.options.write_on_interrupt {
            info!("Interrupted: leaving {:?} unchanged", path);
            report.status = FileStatus::Interrupted;
            return report;
        }

        let bytes = match catalog.serialize() {
            Ok(bytes) => bytes,
            Err(e) => {
                report.status = FileStatus::Failed {
                    stage: PipelineStage::Write,
                    message: e.to_string(),
                };
                return report;
            }
        };
        report.status = match FileManager::write_atomic(path, &bytes) {
            Ok(()) => {
                info!("Wrote {} change(s) to {:?}", catalog.modified_count(), path);
                FileStatus::Written
            }
            Err(e) => FileStatus::Failed {
                stage: PipelineStage::Write,
                message: e.to_string(),
            },
        };
        report
    }

    /// Translate the eligible units of a parsed catalog in memory.
    ///
    /// `progress` is called with `(finished_batches, total_batches)` after
    /// each merge. The returned status is `DryRun` on dry runs, `Unchanged`
    /// when no unit changed and `Written` otherwise (the caller writes).
    pub async fn translate_catalog<F>(&self, catalog: &mut Catalog, progress: F) -> FileReport
    where
        F: Fn(usize, usize),
    {
        let mut report = FileReport::empty(None);
        report.format = Some(catalog.format);
        report.total_units = catalog.units.len();

        let pending = self.select_and_mask(catalog, &mut report);
        let batcher = Batcher::new(self.options.batch_size);
        let total_batches = pending.len().div_ceil(batcher.max_size());
        report.batches = total_batches;
        debug!(
            "{} of {} unit(s) selected, {} batch(es)",
            report.selected, report.total_units, total_batches
        );

        let ai_backend = self.provider.capability() == Capability::AiContextAware;
        let mut outcomes = stream::iter(batcher.build(0..pending.len(), |_| ()))
            .map(|batch| {
                let request = TranslationRequest::new(
                    batch.items.iter().map(|&i| pending[i].masked.clone()).collect(),
                    self.options.source_language.clone(),
                    self.options.target_language.clone(),
                )
                .with_hints(if ai_backend {
                    batch.items.iter().map(|&i| pending[i].hint.clone()).collect()
                } else {
                    Vec::new()
                });
                async move {
                    let outcome = self.dispatch(batch.number, &request).await;
                    (batch, outcome)
                }
            })
            .buffered(self.options.concurrent_requests.max(1));

        let mut finished = 0;
        while let Some((batch, outcome)) = outcomes.next().await {
            match outcome {
                BatchOutcome::Translated(translations) => {
                    for (&i, translated) in batch.items.iter().zip(translations) {
                        self.merge_unit(catalog, &pending[i], &translated, ai_backend, &mut report);
                    }
                }
                BatchOutcome::Failed(error) => {
                    warn!("Batch {} failed, {} unit(s) left untranslated: {}", batch.number, batch.len(), error);
                    for &i in &batch.items {
                        report.failures.push(UnitFailure {
                            index: pending[i].index,
                            source_text: catalog.units[pending[i].index].source_text.clone(),
                            reason: FailureReason::Service {
                                kind: error.kind(),
                                message: error.to_string(),
                            },
                        });
                    }
                }
                BatchOutcome::Cancelled => {
                    report.cancelled = true;
                    for &i in &batch.items {
                        report.failures.push(UnitFailure {
                            index: pending[i].index,
                            source_text: catalog.units[pending[i].index].source_text.clone(),
                            reason: FailureReason::Cancelled,
                        });
                    }
                }
            }
            finished += 1;
            progress(finished, total_batches);
        }

        report.status = if self.options.dry_run {
            report.diffs = diff_units(catalog);
            report.diffs.extend(report.failures.iter().map(|failure| {
                let unit = &catalog.units[failure.index];
                UnitDiff {
                    index: failure.index,
                    context: unit.context.clone(),
                    source_text: unit.source_text.clone(),
                    before: unit.target_text.clone(),
                    after: unit.target_text.clone(),
                    fuzzy_before: unit.fuzzy,
                    fuzzy_after: unit.fuzzy,
                    failure: Some(failure.reason.clone()),
                }
            }));
            report.diffs.sort_by_key(|diff| diff.index);
            FileStatus::DryRun
        } else if catalog.is_modified() {
            FileStatus::Written
        } else {
            FileStatus::Unchanged
        };
        report
    }

    /// Select eligible units, copy placeholder-only ones and mask the rest
    fn select_and_mask(&self, catalog: &mut Catalog, report: &mut FileReport) -> Vec<PendingUnit> {
        let mut pending = Vec::new();
        for (index, unit) in catalog.units.iter_mut().enumerate() {
            if !unit.needs_translation(self.options.skip_fuzzy) {
                report.skipped += 1;
                continue;
            }
            report.selected += 1;

            let (padding, core) = Padding::split(&unit.source_text);
            let terms = self
                .glossary
                .as_ref()
                .map(|g| g.find_terms(core))
                .unwrap_or_default();
            let (masked, tokens) = self.guard.mask_with_terms(core, &terms);
            let restore = match &self.glossary {
                Some(glossary) => glossary.substitute_terms(&tokens),
                None => tokens.clone(),
            };
            unit.placeholders = tokens;

            if is_placeholder_only(&masked) {
                let copied = match self.guard.unmask(&masked, &restore) {
                    Ok(restored) => padding.restore(&restored),
                    Err(_) => unit.source_text.clone(),
                };
                unit.set_translation(copied);
                report.copied += 1;
                report.translated += 1;
                continue;
            }

            let hint = Some(
                unit.context
                    .iter()
                    .chain(unit.comments.iter())
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
            .filter(|h| !h.is_empty());

            pending.push(PendingUnit {
                index,
                core: core.to_string(),
                padding,
                masked,
                restore,
                hint,
            });
        }
        pending
    }

    /// Send one batch, retrying transient failures with exponential backoff
    async fn dispatch(&self, number: usize, request: &TranslationRequest) -> BatchOutcome {
        if number > 1 && self.options.rate_limit_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.options.rate_limit_delay_ms)).await;
        }
        if self.is_cancelled() {
            return BatchOutcome::Cancelled;
        }

        let mut attempt: u32 = 0;
        loop {
            let result = self.provider.translate(request).await.and_then(|translations| {
                if translations.len() == request.len() {
                    Ok(translations)
                } else {
                    Err(ServiceError::Malformed(format!(
                        "{} returned {} translation(s) for {} text(s)",
                        self.provider.name(),
                        translations.len(),
                        request.len()
                    )))
                }
            });

            match result {
                Ok(translations) => return BatchOutcome::Translated(translations),
                Err(error) if error.is_transient() && attempt < self.options.retry_count && !self.is_cancelled() => {
                    attempt += 1;
                    let delay = backoff_delay(self.options.retry_backoff_ms, attempt);
                    warn!(
                        "Batch {}: {} - retry {}/{} in {:?}",
                        number, error, attempt, self.options.retry_count, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return BatchOutcome::Failed(error),
            }
        }
    }

    /// Unmask (placing glossary targets) and store one translation
    fn merge_unit(
        &self,
        catalog: &mut Catalog,
        pending: &PendingUnit,
        translated: &str,
        ai_backend: bool,
        report: &mut FileReport,
    ) {
        let unit = &mut catalog.units[pending.index];
        let translated = if ai_backend {
            strip_added_quotes(&pending.core, translated)
        } else {
            translated.trim()
        };
        if translated.is_empty() {
            report.failures.push(UnitFailure {
                index: pending.index,
                source_text: unit.source_text.clone(),
                reason: FailureReason::EmptyTranslation,
            });
            return;
        }

        match self.guard.unmask(translated, &pending.restore) {
            Ok(restored) => {
                let restored = match_line_endings(&pending.core, &restored);
                unit.set_translation(pending.padding.restore(&restored));
            }
            Err(mismatch) => {
                warn!(
                    "{} in {:?}; keeping the source text as a fuzzy translation",
                    mismatch, unit.source_text
                );
                report.warnings.push(UnitWarning {
                    index: pending.index,
                    source_text: unit.source_text.clone(),
                    message: mismatch.to_string(),
                });
                unit.target_text = unit.source_text.clone();
                unit.fuzzy = true;
            }
        }
        report.translated += 1;
    }
}

/// `base * 2^(attempt-1)` plus up to a quarter of `base` as jitter
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let exponent = attempt.saturating_sub(1).min(16);
    let backoff = base_ms.saturating_mul(1u64 << exponent);
    let jitter = rand::rng().random_range(0..=base_ms / 4);
    Duration::from_millis(backoff.saturating_add(jitter))
}

/// Before/after pairs of every unit changed in memory
pub fn diff_units(catalog: &Catalog) -> Vec<UnitDiff> {
    catalog
        .units
        .iter()
        .enumerate()
        .filter(|(_, unit)| unit.is_modified())
        .map(|(index, unit)| UnitDiff {
            index,
            context: unit.context.clone(),
            source_text: unit.source_text.clone(),
            before: unit.original_target().to_string(),
            after: unit.target_text.clone(),
            fuzzy_before: unit.original_fuzzy(),
            fuzzy_after: unit.fuzzy,
            failure: None,
        })
        .collect()
}
