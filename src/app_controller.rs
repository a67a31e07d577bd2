use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, warn};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::Provider;
use crate::translation::pipeline::{FailureReason, FileReport, FileStatus, Pipeline, PipelineOptions};
use crate::translation::{Glossary, PlaceholderGuard, TranslationService};

// @module: Application controller for catalog translation

/// Totals over all processed files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub files: usize,
    pub written: usize,
    pub unchanged: usize,
    pub dry_run: usize,
    pub interrupted: usize,
    /// Files never started because the run was interrupted
    pub unprocessed: usize,
    pub failed_files: usize,
    pub translated_units: usize,
    pub skipped_units: usize,
    pub failed_units: usize,
    pub cancelled_units: usize,
    pub warnings: usize,
    pub duration: Duration,
}

impl RunSummary {
    fn add(&mut self, report: &FileReport) {
        self.files += 1;
        match report.status {
            FileStatus::Written => self.written += 1,
            FileStatus::Unchanged => self.unchanged += 1,
            FileStatus::DryRun => self.dry_run += 1,
            FileStatus::Interrupted => self.interrupted += 1,
            FileStatus::Failed { .. } => self.failed_files += 1,
        }
        self.translated_units += report.translated;
        self.skipped_units += report.skipped;
        self.failed_units += report.failed_units();
        self.cancelled_units += report.failures.len() - report.failed_units();
        self.warnings += report.warnings.len();
    }

    /// True when no unit failed through a backend error and every file was handled
    pub fn is_success(&self) -> bool {
        self.failed_units == 0 && self.failed_files == 0
    }

    /// Process exit code: 0 on full success, 1 on failures, 130 after an interrupt
    pub fn exit_code(&self) -> u8 {
        if !self.is_success() {
            1
        } else if self.interrupted > 0 || self.unprocessed > 0 || self.cancelled_units > 0 {
            130
        } else {
            0
        }
    }
}

/// Main application controller for catalog translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    cancel: Arc<AtomicBool>,
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            show_progress: std::io::stderr().is_terminal(),
        })
    }

    /// Turn the progress bars on or off
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag that stops the run once set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Translate all catalogs under `paths` with the configured backend
    pub async fn run(&self, paths: &[PathBuf]) -> Result<RunSummary> {
        let service = TranslationService::from_config(&self.config.translation)?;
        self.run_with_provider(&service, paths).await
    }

    /// Translate all catalogs under `paths` with an explicit backend
    pub async fn run_with_provider(&self, provider: &dyn Provider, paths: &[PathBuf]) -> Result<RunSummary> {
        let start_time = Instant::now();
        let files = FileManager::find_catalog_files(paths, self.config.run.recursive)?;
        if files.is_empty() {
            warn!("No catalog files found");
        }

        let pipeline = self.build_pipeline(provider)?;
        info!(
            "Translating {} file(s) from {} to {} with {}{}",
            files.len(),
            language_utils::describe_language(&self.config.source_language),
            language_utils::describe_language(&self.config.target_language),
            self.config.translation.provider.display_name(),
            if self.config.run.dry_run { " (dry run)" } else { "" }
        );

        let multi_progress = MultiProgress::new();
        if !self.show_progress {
            multi_progress.set_draw_target(ProgressDrawTarget::hidden());
        }

        let mut summary = RunSummary::default();
        for path in &files {
            if self.cancel.load(Ordering::SeqCst) {
                summary.unprocessed = files.len() - summary.files;
                warn!("Interrupted: {} file(s) not processed", summary.unprocessed);
                break;
            }

            let progress_bar = multi_progress.add(ProgressBar::new(0));
            progress_bar.set_style(Self::progress_style());
            progress_bar.set_message(path.display().to_string());

            let report = pipeline
                .process_file(path, |done, total| {
                    progress_bar.set_length(total as u64);
                    progress_bar.set_position(done as u64);
                })
                .await;
            progress_bar.finish_and_clear();

            self.log_report(&report);
            if report.status == FileStatus::DryRun {
                print!("{}", render_diff(&report));
            }
            summary.add(&report);
        }

        summary.duration = start_time.elapsed();
        self.log_summary(&summary);
        Ok(summary)
    }

    fn build_pipeline<'a>(&self, provider: &'a dyn Provider) -> Result<Pipeline<'a>> {
        let guard = match &self.config.run.placeholder_rules {
            Some(rules) => PlaceholderGuard::new(rules)?,
            None => PlaceholderGuard::default(),
        };
        let glossary = match &self.config.run.glossary {
            Some(path) => {
                let glossary = Glossary::load(path, self.config.run.glossary_case_sensitive)?;
                debug!("Loaded {} glossary term(s) from {:?}", glossary.len(), path);
                Some(glossary)
            }
            None => None,
        };

        Ok(Pipeline::new(provider, PipelineOptions::from_config(&self.config))
            .with_guard(guard)
            .with_glossary(glossary)
            .with_cancel_flag(self.cancel_flag()))
    }

    fn progress_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    fn log_report(&self, report: &FileReport) {
        let path = report
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        for warning in &report.warnings {
            warn!("{}: {:?}: {}", path, warning.source_text, warning.message);
        }
        for failure in report.failures.iter().filter(|f| !matches!(f.reason, FailureReason::Cancelled)) {
            warn!("{}: {:?} not translated: {}", path, failure.source_text, failure.reason);
        }

        match &report.status {
            FileStatus::Failed { stage, message } => error!("{}: failed at {} stage: {}", path, stage, message),
            FileStatus::Interrupted => warn!("{}: interrupted, file left unchanged", path),
            status => info!(
                "{}: {} translated, {} skipped, {} failed{}",
                path,
                report.translated,
                report.skipped,
                report.failed_units(),
                match status {
                    FileStatus::Unchanged => " (unchanged)",
                    FileStatus::DryRun => " (dry run)",
                    _ => "",
                }
            ),
        }
    }

    fn log_summary(&self, summary: &RunSummary) {
        let message = format!(
            "{} file(s): {} written, {} unchanged, {} failed; {} unit(s) translated, {} skipped, {} failed - Duration: {}",
            summary.files,
            summary.written + summary.dry_run,
            summary.unchanged,
            summary.failed_files,
            summary.translated_units,
            summary.skipped_units,
            summary.failed_units,
            Self::format_duration(summary.duration)
        );
        if summary.is_success() {
            info!("{}", message);
        } else {
            error!("{}", message);
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Human-readable listing of a dry run: before/after pairs, `!` for units left untranslated
pub fn render_diff(report: &FileReport) -> String {
    if report.diffs.is_empty() {
        return String::new();
    }
    let path = report
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let fuzzy = |flag: bool| if flag { " (fuzzy)" } else { "" };

    let mut out = format!("--- {}\n", path);
    for diff in &report.diffs {
        let context = diff
            .context
            .as_ref()
            .map(|c| format!("[{}] ", c))
            .unwrap_or_default();
        match &diff.failure {
            Some(reason) => {
                out.push_str(&format!("! {}{:?} (failed: {})\n", context, diff.source_text, reason));
            }
            None => {
                out.push_str(&format!("@@ {}{:?}\n", context, diff.source_text));
                out.push_str(&format!("- {:?}{}\n", diff.before, fuzzy(diff.fuzzy_before)));
                out.push_str(&format!("+ {:?}{}\n", diff.after, fuzzy(diff.fuzzy_after)));
            }
        }
    }
    out
}
