/*!
 * Common test utilities for the po-translate test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use po_translate::app_config::Config;
use po_translate::translation::PipelineOptions;

/// Route library logs through env_logger (`RUST_LOG=po_translate=debug cargo test`)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Helper to get the absolute path to a test resource
pub fn test_resource_path(relative_path: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("resources");
    path.push(relative_path);
    path
}

/// Copies a resource file into `dir` so a test may rewrite it
pub fn copy_resource(dir: &Path, name: &str) -> Result<PathBuf> {
    let target = dir.join(name);
    fs::copy(test_resource_path(name), &target)?;
    Ok(target)
}

/// A PO catalog with one untranslated entry per text
pub fn po_with_entries(texts: &[&str]) -> String {
    let mut content = String::from("msgid \"\"\nmsgstr \"\"\n\"Language: sv\\n\"\n\"Content-Type: text/plain; charset=UTF-8\\n\"\n");
    for text in texts {
        content.push_str(&format!("\nmsgid \"{}\"\nmsgstr \"\"\n", text));
    }
    content
}

/// English to Swedish with default settings and no waiting
pub fn test_config() -> Config {
    let mut config = Config::new("en", "sv");
    config.translation.common.retry_backoff_ms = 0;
    config.translation.common.rate_limit_delay_ms = 0;
    config.translation.common.request_delay_ms = 0;
    config
}

/// Pipeline options matching [`test_config`]
pub fn test_options() -> PipelineOptions {
    PipelineOptions::from_config(&test_config())
}
