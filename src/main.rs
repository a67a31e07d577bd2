#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, warn};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use po_translate::app_config::{self, Config, TranslationProvider};
use po_translate::app_controller::Controller;
use po_translate::language_utils;

/// CLI wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliService {
    Lingva,
    #[value(name = "mymemory")]
    MyMemory,
    #[value(name = "libretranslate")]
    LibreTranslate,
    #[value(name = "deepl")]
    DeepL,
    #[value(name = "deepl-free")]
    DeepLFree,
    Google,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
}

impl From<CliService> for TranslationProvider {
    fn from(service: CliService) -> Self {
        match service {
            CliService::Lingva => TranslationProvider::Lingva,
            CliService::MyMemory => TranslationProvider::MyMemory,
            CliService::LibreTranslate => TranslationProvider::LibreTranslate,
            CliService::DeepL => TranslationProvider::DeepL,
            CliService::DeepLFree => TranslationProvider::DeepLFree,
            CliService::Google => TranslationProvider::Google,
            CliService::OpenAI => TranslationProvider::OpenAI,
            CliService::Anthropic => TranslationProvider::Anthropic,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for po-translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// po-translate - machine translation for localization catalogs
#[derive(Parser, Debug)]
#[command(name = "po-translate")]
#[command(version)]
#[command(about = "Translate gettext PO, Qt TS and XLIFF catalogs with online translation services")]
#[command(subcommand_negates_reqs = true)]
#[command(long_about = "po-translate fills in missing and fuzzy translations of localization catalogs.

EXAMPLES:
    po-translate -s en -t de po/                      # Translate every catalog under po/
    po-translate -s en -t fr --dry-run fr.po          # Show what would change
    po-translate -s en --service deepl --api-key KEY sv.ts
    po-translate -s en -t ja --service openai --glossary terms.csv app.xlf
    po-translate completions bash > po-translate.bash

SERVICES:
    lingva         - Lingva Translate (default, no key)
    mymemory       - MyMemory (no key, optional --email for a larger quota)
    libretranslate - LibreTranslate (key depends on the instance)
    deepl          - DeepL Pro (API key)
    deepl-free     - DeepL Free (API key)
    google         - Google Cloud Translation (API key)
    openai         - OpenAI chat completions (API key)
    anthropic      - Anthropic messages API (API key)

The target language defaults to the one from LANG or LC_ALL.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Catalog files or directories to translate
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Source language code (e.g. 'en')
    #[arg(short, long, required_unless_present = "config")]
    source: Option<String>,

    /// Target language code (defaults to the language from LANG / LC_ALL)
    #[arg(short, long)]
    target: Option<String>,

    /// Translation service
    #[arg(long, value_enum)]
    service: Option<CliService>,

    /// API key for the service
    #[arg(long, env = "PO_TRANSLATE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Service endpoint URL
    #[arg(long)]
    url: Option<String>,

    /// Model name for AI services
    #[arg(short, long)]
    model: Option<String>,

    /// Number of entries sent per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Glossary file with `source,target` lines
    #[arg(short, long, value_name = "FILE")]
    glossary: Option<PathBuf>,

    /// Match glossary terms case-sensitively
    #[arg(long)]
    glossary_case_sensitive: bool,

    /// Leave fuzzy entries untouched
    #[arg(long)]
    skip_fuzzy: bool,

    /// Contact email for MyMemory
    #[arg(long)]
    email: Option<String>,

    /// Retries for rate-limited or failed requests
    #[arg(long)]
    retries: Option<u32>,

    /// Requests in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Write completed translations when interrupted
    #[arg(long)]
    write_on_interrupt: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("po_translate")
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "\x1B[{}m{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Merge the config file (if any), CLI flags and the environment
fn build_config(options: &CommandLineOptions) -> Result<Config> {
    let mut config = match &options.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(source) = &options.source {
        config.source_language = source.clone();
    }
    if let Some(target) = &options.target {
        config.target_language = target.clone();
    }
    if config.target_language.is_empty() {
        let lang = std::env::var("LANG").ok();
        let lc_all = std::env::var("LC_ALL").ok();
        config.target_language = language_utils::language_from_env(lang.as_deref(), lc_all.as_deref())
            .ok_or_else(|| anyhow!("No target language: pass --target or set LANG"))?;
        debug!("Target language {} taken from the environment", config.target_language);
    }

    if let Some(service) = options.service {
        config.translation.provider = service.into();
    }
    let provider_config = config.translation.active_provider_config_mut();
    if let Some(api_key) = &options.api_key {
        provider_config.api_key = api_key.clone();
    }
    if let Some(url) = &options.url {
        provider_config.endpoint = url.clone();
    }
    if let Some(model) = &options.model {
        provider_config.model = model.clone();
    }
    if let Some(email) = &options.email {
        provider_config.email = email.clone();
    }

    if let Some(retries) = options.retries {
        config.translation.common.retry_count = retries;
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.common.concurrent_requests = concurrency;
    }
    if let Some(batch_size) = options.batch_size {
        config.run.batch_size = batch_size;
    }
    if let Some(glossary) = &options.glossary {
        config.run.glossary = Some(glossary.clone());
    }
    config.run.dry_run |= options.dry_run;
    config.run.skip_fuzzy |= options.skip_fuzzy;
    config.run.glossary_case_sensitive |= options.glossary_case_sensitive;
    config.run.write_on_interrupt |= options.write_on_interrupt;
    if options.no_recursive {
        config.run.recursive = false;
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }

    Ok(config)
}

async fn run(options: CommandLineOptions) -> Result<u8> {
    if let Some(log_level) = options.log_level {
        let level: app_config::LogLevel = log_level.into();
        log::set_max_level(level_filter(&level));
    }

    let config = build_config(&options)?;
    log::set_max_level(level_filter(&config.log_level));

    let controller = Controller::with_config(config)?;

    let cancel = controller.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing requests in flight");
            cancel.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let summary = controller.run(&options.paths).await?;
    Ok(summary.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    if CustomLogger::init(LevelFilter::Info).is_err() {
        eprintln!("Failed to initialize logger");
    }

    let options = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &options.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "po-translate", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    match run(options).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
