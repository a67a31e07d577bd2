/*!
 * # po-translate
 *
 * Batch machine translation of software localization catalogs.
 *
 * ## Features
 *
 * - gettext PO, Qt Linguist TS and XLIFF 1.2 catalogs, rewritten in place
 *   with everything but the translated entries preserved byte for byte
 * - Translation through several backends:
 *   - Lingva, MyMemory and LibreTranslate (free)
 *   - DeepL, DeepL Free and Google Cloud Translation (API key)
 *   - OpenAI and Anthropic (context-aware AI backends)
 * - Placeholders and markup masked so backends cannot damage them
 * - Glossary terms forced into translations
 * - Batching, retries with backoff and per-batch failure isolation
 * - Dry runs that show what would change
 *
 * ## Architecture
 *
 * - `catalog`: format adapters and the in-memory catalog model
 * - `translation`: masking, glossary, batching and the pipeline
 * - `providers`: HTTP clients for the translation backends
 * - `app_config`: configuration management
 * - `app_controller`: runs the pipeline over all input files
 * - `file_utils`: catalog discovery and atomic writes
 * - `language_utils`: ISO 639 language code helpers
 * - `errors`: error types shared across the crate
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod catalog;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

pub use app_config::Config;
pub use app_controller::{Controller, RunSummary};
pub use catalog::{Catalog, CatalogFormat, TranslationUnit};
pub use errors::{AppError, ParseError, PlaceholderMismatch, ServiceError, ServiceErrorKind, WriteError};
pub use language_utils::{get_language_name, language_codes_match};
pub use translation::TranslationService;
