/*!
 * Glossary overrides.
 *
 * A glossary is a flat list of `source,target` pairs. Source terms found in a
 * unit are masked before dispatch like placeholders and come back as their
 * target term on unmask, so placeholders that happen to contain a term are
 * never touched. Matching is whole-word for terms that start and end with
 * word characters; case sensitivity is fixed when loading.
 */

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use regex::{Regex, RegexBuilder};

use crate::translation::placeholders::{GLOSSARY_RULE, PlaceholderToken};

/// One `source,target` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub source_term: String,
    pub target_term: String,
}

/// Compiled glossary
#[derive(Debug, Clone)]
pub struct Glossary {
    entries: Vec<(GlossaryEntry, Regex)>,
    case_sensitive: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn term_regex(term: &str, case_sensitive: bool) -> Result<Regex> {
    let starts_word = term.chars().next().is_some_and(is_word_char);
    let ends_word = term.chars().last().is_some_and(is_word_char);
    let pattern = format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(term),
        if ends_word { r"\b" } else { "" }
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .with_context(|| format!("Invalid glossary term: {}", term))
}

impl Glossary {
    /// Build a glossary from pairs; longer source terms take precedence over shorter ones
    pub fn new(entries: Vec<GlossaryEntry>, case_sensitive: bool) -> Result<Self> {
        let mut compiled = entries
            .into_iter()
            .map(|entry| term_regex(&entry.source_term, case_sensitive).map(|re| (entry, re)))
            .collect::<Result<Vec<_>>>()?;
        compiled.sort_by_key(|(entry, _)| std::cmp::Reverse(entry.source_term.chars().count()));
        Ok(Self {
            entries: compiled,
            case_sensitive,
        })
    }

    /// Parse glossary file content; blank lines and `#` comments are skipped
    pub fn parse(content: &str, case_sensitive: bool) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (source, target) = line
                .split_once(',')
                .ok_or_else(|| anyhow!("Glossary line {}: expected `source,target`, found `{}`", index + 1, line))?;
            let (source, target) = (source.trim(), target.trim());
            if source.is_empty() || target.is_empty() {
                return Err(anyhow!("Glossary line {}: source and target terms must not be empty", index + 1));
            }
            entries.push(GlossaryEntry {
                source_term: source.to_string(),
                target_term: target.to_string(),
            });
        }
        Self::new(entries, case_sensitive)
    }

    /// Load a glossary file
    pub fn load<P: AsRef<Path>>(path: P, case_sensitive: bool) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary file: {:?}", path))?;
        Self::parse(&content, case_sensitive)
            .with_context(|| format!("Failed to parse glossary file: {:?}", path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn entries(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.entries.iter().map(|(entry, _)| entry)
    }

    /// Non-overlapping spans of `text` matched by any term, leftmost first, longest on ties
    fn spans(&self, text: &str, only: impl Fn(usize) -> bool) -> Vec<(Range<usize>, usize)> {
        let mut found: Vec<(Range<usize>, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| only(*i))
            .flat_map(|(i, (_, re))| re.find_iter(text).map(move |m| (m.range(), i)))
            .collect();
        found.sort_by(|(a, _), (b, _)| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));

        let mut selected = Vec::with_capacity(found.len());
        let mut cursor = 0;
        for (range, entry) in found {
            if range.start >= cursor {
                cursor = range.end;
                selected.push((range, entry));
            }
        }
        selected
    }

    /// Source-term spans in a source text, for masking before dispatch
    pub fn find_terms(&self, source: &str) -> Vec<Range<usize>> {
        self.spans(source, |_| true).into_iter().map(|(range, _)| range).collect()
    }

    /// Target term for a span that [`Glossary::find_terms`] cut out of a source text
    pub fn target_for(&self, term: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, re)| re.find(term).is_some_and(|m| m.start() == 0 && m.end() == term.len()))
            .map(|(entry, _)| entry.target_term.as_str())
    }

    /// Tokens to unmask with: glossary terms carry their target term, everything else stays verbatim
    pub fn substitute_terms(&self, tokens: &[PlaceholderToken]) -> Vec<PlaceholderToken> {
        tokens
            .iter()
            .map(|token| match self.target_for(&token.text) {
                Some(target) if token.rule == GLOSSARY_RULE => PlaceholderToken {
                    text: target.to_string(),
                    ..token.clone()
                },
                _ => token.clone(),
            })
            .collect()
    }

    /// Force target terms into every span of `translated` that matches a term present in `source`.
    ///
    /// This works on plain text: matches inside placeholders and terms the
    /// backend produced on its own are rewritten as well.
    pub fn apply(&self, source: &str, translated: &str) -> String {
        let present: Vec<bool> = self.entries.iter().map(|(_, re)| re.is_match(source)).collect();
        if !present.iter().any(|p| *p) {
            return translated.to_string();
        }
        let spans = self.spans(translated, |i| present[i]);

        let mut out = String::with_capacity(translated.len());
        let mut cursor = 0;
        for (range, entry) in spans {
            out.push_str(&translated[cursor..range.start]);
            out.push_str(&self.entries[entry].0.target_term);
            cursor = range.end;
        }
        out.push_str(&translated[cursor..]);
        out
    }
}
