/*!
 * Format-neutral catalog model and the adapters that read and write it.
 *
 * A [`Catalog`] keeps the text it was parsed from next to its units. Adapters
 * re-emit untouched units straight from that text, so only the units the
 * pipeline actually changed are re-rendered on write.
 */

use std::fmt;
use std::path::Path;

use crate::errors::ParseError;
use crate::translation::placeholders::PlaceholderToken;

pub mod po;
pub mod ts;
pub mod xliff;
mod xml;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One translatable string extracted from a catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Text to translate, never changed after parsing
    pub source_text: String,
    /// Current translation, empty when untranslated
    pub target_text: String,
    /// Disambiguation context (msgctxt, TS context name, XLIFF resname)
    pub context: Option<String>,
    /// Translator and developer comments, in file order
    pub comments: Vec<String>,
    /// Needs review
    pub fuzzy: bool,
    /// Source reference, when the format carries one
    pub location: Option<String>,
    /// Placeholders found in the source by the last masking pass
    pub placeholders: Vec<PlaceholderToken>,
    /// Plural form index for PO plural entries and TS numerus messages
    pub plural_index: Option<usize>,
    /// Format-level identifier (XLIFF trans-unit id)
    pub id: Option<String>,
    original_target: String,
    original_fuzzy: bool,
}

impl TranslationUnit {
    pub fn new(source_text: impl Into<String>, target_text: impl Into<String>) -> Self {
        let target_text = target_text.into();
        Self {
            source_text: source_text.into(),
            original_target: target_text.clone(),
            target_text,
            context: None,
            comments: Vec::new(),
            fuzzy: false,
            location: None,
            placeholders: Vec::new(),
            plural_index: None,
            id: None,
            original_fuzzy: false,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self.original_fuzzy = fuzzy;
        self
    }

    /// `(context, source_text)`; duplicates are allowed within a catalog
    pub fn identity(&self) -> (Option<&str>, &str) {
        (self.context.as_deref(), &self.source_text)
    }

    /// Whether the target or fuzzy state differs from what was parsed
    pub fn is_modified(&self) -> bool {
        self.target_text != self.original_target || self.fuzzy != self.original_fuzzy
    }

    /// Target text as it was when the catalog was parsed
    pub fn original_target(&self) -> &str {
        &self.original_target
    }

    pub fn original_fuzzy(&self) -> bool {
        self.original_fuzzy
    }

    /// Empty targets always qualify; fuzzy ones unless `skip_fuzzy` is set.
    pub fn needs_translation(&self, skip_fuzzy: bool) -> bool {
        if self.source_text.trim().is_empty() {
            return false;
        }
        self.target_text.is_empty() || (self.fuzzy && !skip_fuzzy)
    }

    /// Store a finished translation and clear the review flag
    pub fn set_translation(&mut self, text: impl Into<String>) {
        self.target_text = text.into();
        self.fuzzy = false;
    }
}

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogFormat {
    Po,
    Ts,
    Xliff,
}

impl CatalogFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "po" => Some(Self::Po),
            "ts" => Some(Self::Ts),
            "xlf" | "xliff" => Some(Self::Xliff),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Po => "PO",
            Self::Ts => "TS",
            Self::Xliff => "XLIFF",
        }
    }

    pub fn adapter(&self) -> &'static dyn FormatAdapter {
        match self {
            Self::Po => &po::PoAdapter,
            Self::Ts => &ts::TsAdapter,
            Self::Xliff => &xliff::XliffAdapter,
        }
    }
}

impl fmt::Display for CatalogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-format bookkeeping needed to write changed units back in place
#[derive(Debug, Clone)]
pub(crate) enum Layout {
    Po(po::PoLayout),
    Ts(xml::XmlLayout),
    Xliff(xml::XmlLayout),
}

/// A parsed catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    pub format: CatalogFormat,
    pub units: Vec<TranslationUnit>,
    /// PO header fields, or root attributes for the XML formats
    pub metadata: Vec<(String, String)>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    has_bom: bool,
    original: String,
    layout: Layout,
}

impl Catalog {
    pub(crate) fn new(format: CatalogFormat, decoded: Decoded, units: Vec<TranslationUnit>, layout: Layout) -> Self {
        Self {
            format,
            units,
            metadata: Vec::new(),
            source_language: None,
            target_language: None,
            has_bom: decoded.has_bom,
            original: decoded.text,
            layout,
        }
    }

    /// Parse a catalog, picking the adapter for `format`
    pub fn parse(format: CatalogFormat, bytes: &[u8]) -> Result<Self, ParseError> {
        format.adapter().parse(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        self.format.adapter().serialize(self)
    }

    /// Look up a metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn modified_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_modified()).count()
    }

    pub fn is_modified(&self) -> bool {
        self.units.iter().any(|u| u.is_modified())
    }

    pub(crate) fn original(&self) -> &str {
        &self.original
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn finish_bytes(&self, text: String) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if self.has_bom {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(text.as_bytes());
        out
    }
}

/// Reads and writes one catalog format
pub trait FormatAdapter: Send + Sync {
    fn format(&self) -> CatalogFormat;

    /// Parse raw file bytes into a catalog
    fn parse(&self, bytes: &[u8]) -> Result<Catalog, ParseError>;

    /// Render the catalog; unchanged units come out byte-for-byte as parsed
    fn serialize(&self, catalog: &Catalog) -> Result<Vec<u8>, ParseError>;
}

/// Decoded file text with the BOM stripped
#[derive(Debug)]
pub(crate) struct Decoded {
    pub text: String,
    pub has_bom: bool,
}

/// Decode catalog bytes as UTF-8, naming the declared charset on failure
pub(crate) fn decode_utf8(format: CatalogFormat, bytes: &[u8]) -> Result<Decoded, ParseError> {
    let (has_bom, body) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, bytes),
    };
    match std::str::from_utf8(body) {
        Ok(text) => Ok(Decoded {
            text: text.to_string(),
            has_bom,
        }),
        Err(e) => {
            let declared = declared_charset(&String::from_utf8_lossy(body))
                .unwrap_or_else(|| "unknown".to_string());
            Err(ParseError::new(
                format.name(),
                None,
                format!(
                    "file is not valid UTF-8 (declared charset: {}, invalid byte at offset {})",
                    declared,
                    e.valid_up_to()
                ),
            ))
        }
    }
}

fn declared_charset(text: &str) -> Option<String> {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static CHARSET: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?i)(?:charset=|encoding=["'])([A-Za-z0-9_.:-]+)"#).expect("valid charset regex")
    });
    CHARSET.captures(text).map(|c| c[1].to_string())
}

/// 1-based line number of a byte offset
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}
