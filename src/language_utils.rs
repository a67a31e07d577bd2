use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for catalog language codes
///
/// Catalogs and services use ISO 639 codes, often with a region or script
/// suffix (`pt-BR`, `zh_CN`, `sr@latin`). Only the primary subtag is checked
/// against ISO 639; the suffix is passed through untouched.

/// The ISO 639 part of a code, lower-cased (`pt_BR.UTF-8` -> `pt`)
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_', '@', '.'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn lookup(code: &str) -> Option<Language> {
    let primary = primary_subtag(code);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
}

/// Validate that a code's primary subtag is an ISO 639-1 or ISO 639-3 code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Name for prompts: `German (de)`, or the bare code when unknown
pub fn describe_language(code: &str) -> String {
    match get_language_name(code) {
        Ok(name) => format!("{} ({})", name, code),
        Err(_) => code.to_string(),
    }
}

/// Check if two language codes name the same language, ignoring region
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Default target language from a snapshot of `LANG` and `LC_ALL`.
///
/// `LANG` is consulted first, `LC_ALL` only when `LANG` is unset or empty.
/// `sv_SE.UTF-8` yields `sv`; the `C` and `POSIX` locales yield nothing.
pub fn language_from_env(lang: Option<&str>, lc_all: Option<&str>) -> Option<String> {
    let value = [lang, lc_all]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())?;
    let code = value.split('_').next()?.split('.').next()?.trim();
    if code.is_empty() || code == "C" || code == "POSIX" {
        None
    } else {
        Some(code.to_string())
    }
}
