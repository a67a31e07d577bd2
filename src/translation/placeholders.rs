/*!
 * Placeholder protection.
 *
 * Interpolation placeholders, inline markup and entities are swapped for
 * numbered markers (`⟦0⟧`, `⟦1⟧`, ...) before text leaves the process, and
 * swapped back afterwards. Rules are an ordered, configurable list; at every
 * position the longest match wins and ties go to the earlier rule.
 */

use std::ops::Range;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::PlaceholderMismatch;

/// Opening sentinel of a marker
pub const MARKER_OPEN: char = '⟦';
/// Closing sentinel of a marker
pub const MARKER_CLOSE: char = '⟧';

/// Rule name given to spans masked on behalf of the glossary
pub const GLOSSARY_RULE: &str = "glossary";

static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"⟦\s*(\d+)\s*⟧").expect("Invalid marker regex")
});

static DEFAULT_GUARD: Lazy<PlaceholderGuard> = Lazy::new(|| {
    PlaceholderGuard::new(&default_rules()).expect("Invalid default placeholder rules")
});

/// A named pattern recognising one kind of placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderRule {
    pub name: String,
    pub pattern: String,
}

impl PlaceholderRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// The built-in rule list, in priority order
pub fn default_rules() -> Vec<PlaceholderRule> {
    vec![
        // Literal sentinels in the source must not be confused with markers
        PlaceholderRule::new("sentinel", r"[⟦⟧]"),
        PlaceholderRule::new("printf-named", r"%\([A-Za-z_][A-Za-z0-9_]*\)[-+#0]*\d*(?:\.\d+)?[sdifuxXoeEgGcr]"),
        PlaceholderRule::new("printf-positional", r"%\d+\$[-+#0]*\d*(?:\.\d+)?(?:hh|h|ll|l|L|z|j|t)?[sdifuxXoeEgGcp]"),
        PlaceholderRule::new("qt", r"%L?(?:\d+|n)"),
        PlaceholderRule::new("printf", r"%[-+#0]*\d*(?:\.\d+)?(?:hh|h|ll|l|L|z|j|t)?[sdifuxXoeEgGcp%]"),
        PlaceholderRule::new("brace-double", r"\{\{[^{}]*\}\}"),
        PlaceholderRule::new("brace", r"\{[A-Za-z0-9_.\[\]]*(?::[^{}]*)?\}"),
        PlaceholderRule::new("markup", r"</?[A-Za-z][A-Za-z0-9:_.-]*(?:\s+[^<>]*?)?/?>"),
        PlaceholderRule::new("entity", r"&(?:[A-Za-z][A-Za-z0-9]*|#\d+|#[xX][0-9A-Fa-f]+);"),
    ]
}

/// One protected span of the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    /// Matched text, restored verbatim on unmask
    pub text: String,
    /// Byte offset in the text that was masked
    pub offset: usize,
    /// Name of the rule that matched
    pub rule: String,
}

/// Masks and restores placeholders according to an ordered rule list
#[derive(Debug, Clone)]
pub struct PlaceholderGuard {
    rules: Vec<(String, Regex)>,
}

impl Default for PlaceholderGuard {
    fn default() -> Self {
        DEFAULT_GUARD.clone()
    }
}

impl PlaceholderGuard {
    /// Compile a rule list; every pattern is anchored at the scan position
    pub fn new(rules: &[PlaceholderRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&format!("^(?:{})", rule.pattern))
                    .map(|re| (rule.name.clone(), re))
                    .with_context(|| format!("Invalid placeholder rule '{}': {}", rule.name, rule.pattern))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(name, _)| name.as_str())
    }

    /// Replace every placeholder with a numbered marker
    pub fn mask(&self, text: &str) -> (String, Vec<PlaceholderToken>) {
        self.mask_with_terms(text, &[])
    }

    /// Like [`mask`](Self::mask), additionally protecting the given spans (glossary terms).
    ///
    /// A term span only wins where no longer placeholder starts at the same position.
    pub fn mask_with_terms(&self, text: &str, terms: &[Range<usize>]) -> (String, Vec<PlaceholderToken>) {
        let mut masked = String::with_capacity(text.len() + 8);
        let mut tokens = Vec::new();
        let mut plain_start = 0;
        let mut i = 0;

        while i < text.len() {
            match self.longest_match_at(text, i, terms) {
                Some((len, rule)) => {
                    masked.push_str(&text[plain_start..i]);
                    masked.push_str(&marker(tokens.len()));
                    tokens.push(PlaceholderToken {
                        text: text[i..i + len].to_string(),
                        offset: i,
                        rule,
                    });
                    i += len;
                    plain_start = i;
                }
                None => {
                    i += text[i..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        masked.push_str(&text[plain_start..]);
        (masked, tokens)
    }

    fn longest_match_at(&self, text: &str, at: usize, terms: &[Range<usize>]) -> Option<(usize, String)> {
        let rest = &text[at..];
        let mut best: Option<(usize, &str)> = None;
        for (name, regex) in &self.rules {
            if let Some(m) = regex.find(rest) {
                let len = m.end();
                if len > 0 && best.is_none_or(|(best_len, _)| len > best_len) {
                    best = Some((len, name.as_str()));
                }
            }
        }
        for term in terms.iter().filter(|t| t.start == at && t.end > t.start && t.end <= text.len()) {
            let len = term.end - term.start;
            if best.is_none_or(|(best_len, _)| len > best_len) {
                best = Some((len, GLOSSARY_RULE));
            }
        }
        best.map(|(len, name)| (len, name.to_string()))
    }

    /// Put the original placeholders back, matching markers by index.
    ///
    /// Markers may be reordered and may carry whitespace inside the brackets,
    /// but every index must appear exactly once.
    pub fn unmask(&self, translated: &str, tokens: &[PlaceholderToken]) -> Result<String, PlaceholderMismatch> {
        let mut seen = vec![false; tokens.len()];
        let mut found = 0;
        let mut valid = true;
        for caps in MARKER_REGEX.captures_iter(translated) {
            found += 1;
            match caps[1].parse::<usize>() {
                Ok(index) if index < tokens.len() && !seen[index] => seen[index] = true,
                _ => valid = false,
            }
        }
        let stray = translated.matches(MARKER_OPEN).count() != found
            || translated.matches(MARKER_CLOSE).count() != found;
        if !valid || stray || found != tokens.len() {
            return Err(PlaceholderMismatch {
                expected: tokens.len(),
                found,
            });
        }

        Ok(MARKER_REGEX
            .replace_all(translated, |caps: &regex::Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| tokens.get(i))
                    .map(|t| t.text.clone())
                    .unwrap_or_default()
            })
            .into_owned())
    }
}

/// Marker text for a token index
pub fn marker(index: usize) -> String {
    format!("{}{}{}", MARKER_OPEN, index, MARKER_CLOSE)
}

/// True when nothing but markers and whitespace remains
pub fn is_placeholder_only(masked: &str) -> bool {
    MARKER_REGEX.replace_all(masked, "").trim().is_empty()
}
