/*!
 * Translation of catalog units.
 *
 * - `core`: backend selection (`TranslationService`)
 * - `batch`: grouping of units into backend requests
 * - `placeholders`: masking of format placeholders and markup
 * - `glossary`: forced term translations
 * - `formatting`: whitespace, quote and line-ending shaping
 * - `prompts`: prompt construction for AI backends
 * - `pipeline`: the per-file translation pipeline
 */

pub use self::batch::{Batch, Batcher};
pub use self::core::TranslationService;
pub use self::glossary::{Glossary, GlossaryEntry};
pub use self::pipeline::{FileReport, FileStatus, Pipeline, PipelineOptions};
pub use self::placeholders::{PlaceholderGuard, PlaceholderRule, PlaceholderToken};

pub mod batch;
pub mod core;
pub mod formatting;
pub mod glossary;
pub mod pipeline;
pub mod placeholders;
pub mod prompts;
