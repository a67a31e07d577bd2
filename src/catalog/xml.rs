/*!
 * Shared plumbing for the XML-based formats (TS and XLIFF).
 *
 * Parsing walks quick-xml events while tracking byte offsets, so the writer
 * can patch only the spans of changed targets and leave every other byte of
 * the document as it was.
 */

use std::ops::Range;

use quick_xml::Reader;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use super::line_of;
use crate::errors::ParseError;

/// Target locations for every unit of an XML catalog, index-aligned with `Catalog::units`
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlLayout {
    pub newline: &'static str,
    pub groups: Vec<TargetGroup>,
}

/// One target element (or the place one must be inserted) and the units written into it
#[derive(Debug, Clone)]
pub(crate) struct TargetGroup {
    pub units: Range<usize>,
    /// Qualified element name used when the element has to be created
    pub name: String,
    pub element: Option<Element>,
    /// Child elements holding individual plural forms (TS numerus forms)
    pub forms: Vec<Element>,
    pub numerus: bool,
    /// Where a missing element is inserted, and the indentation to use
    pub insert_at: usize,
    pub indent: String,
    /// Raw inline markup copied from the source, written back unescaped
    pub inline_tags: Vec<String>,
}

/// Byte spans of an existing element
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub name: String,
    /// Start tag, or the whole tag when self-closing
    pub tag: Range<usize>,
    /// Content between the tags; `None` when self-closing
    pub content: Option<Range<usize>>,
}

/// Text content of an element with inline markup kept raw
#[derive(Debug, Default)]
pub(crate) struct Inner {
    pub text: String,
    pub tags: Vec<String>,
    pub content: Range<usize>,
    pub end: usize,
}

impl Inner {
    fn push_markup(&mut self, raw: &str) {
        self.text.push_str(raw);
        if !self.tags.iter().any(|t| t == raw) {
            self.tags.push(raw.to_string());
        }
    }
}

/// A replacement of one byte range of the original document
#[derive(Debug)]
pub(crate) struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at..at, text)
    }
}

/// Event reader that reports the byte span of each event
pub(crate) struct XmlCursor<'a> {
    reader: Reader<&'a [u8]>,
    src: &'a str,
    format: &'static str,
}

impl<'a> XmlCursor<'a> {
    pub fn new(src: &'a str, format: &'static str) -> Self {
        let mut reader = Reader::from_str(src);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = true;
        Self { reader, src, format }
    }

    pub fn next(&mut self) -> Result<(Event<'a>, Range<usize>), ParseError> {
        let start = self.reader.buffer_position() as usize;
        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let at = self.reader.error_position() as usize;
                return Err(self.error_at(at, format!("invalid XML: {}", e)));
            }
        };
        let end = self.reader.buffer_position() as usize;
        Ok((event, start..end))
    }

    pub fn error_at(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.format, Some(line_of(self.src, offset)), message)
    }

    pub fn raw(&self, range: Range<usize>) -> &'a str {
        &self.src[range]
    }

    /// Consume everything up to the matching end tag of an element whose start tag was just read
    pub fn read_inner(&mut self, open: &Range<usize>) -> Result<Inner, ParseError> {
        let mut inner = Inner {
            content: open.end..open.end,
            ..Default::default()
        };
        let mut depth = 0usize;
        loop {
            let (event, span) = self.next()?;
            match event {
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| self.error_at(span.start, format!("invalid text: {}", e)))?;
                    inner.text.push_str(&value);
                }
                Event::CData(data) => {
                    let value = std::str::from_utf8(&data)
                        .map_err(|e| self.error_at(span.start, e.to_string()))?;
                    inner.text.push_str(value);
                }
                Event::End(_) if depth == 0 => {
                    inner.content = open.end..span.start;
                    inner.end = span.end;
                    return Ok(inner);
                }
                Event::Start(_) => {
                    depth += 1;
                    inner.push_markup(self.raw(span));
                }
                Event::End(_) => {
                    depth -= 1;
                    inner.push_markup(self.raw(span));
                }
                Event::Empty(_) | Event::Comment(_) | Event::PI(_) => inner.push_markup(self.raw(span)),
                Event::Eof => return Err(self.error_at(open.start, "element is never closed")),
                _ => {}
            }
        }
    }
}

pub(crate) fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

pub(crate) fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Unescaped attribute value
pub(crate) fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, String> {
    match e.try_get_attribute(name) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|e| e.to_string()),
        Ok(None) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

/// Whitespace between the start of the line and `offset`, if that is all there is
pub(crate) fn indent_before(src: &str, offset: usize) -> String {
    let line_start = src[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &src[line_start..offset];
    if prefix.chars().all(char::is_whitespace) {
        prefix.to_string()
    } else {
        String::new()
    }
}

/// Escape target text for element content, leaving known inline markup untouched
pub(crate) fn escape_with_tags(text: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        return partial_escape(text).into_owned();
    }
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));

    let mut out = String::with_capacity(text.len() + 16);
    let mut plain_start = 0;
    let mut i = 0;
    while i < text.len() {
        if let Some(tag) = sorted.iter().find(|t| text[i..].starts_with(**t)) {
            out.push_str(&partial_escape(&text[plain_start..i]));
            out.push_str(tag);
            i += tag.len();
            plain_start = i;
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    out.push_str(&partial_escape(&text[plain_start..]));
    out
}

/// Set, replace or remove one attribute in a raw start tag
pub(crate) fn set_attribute(tag: &str, pattern: &Regex, name: &str, value: Option<&str>) -> String {
    let rendered = value.map(|v| format!(" {}=\"{}\"", name, partial_escape(v).replace('"', "&quot;")));
    if let Some(found) = pattern.find(tag) {
        let mut out = String::with_capacity(tag.len() + 24);
        out.push_str(&tag[..found.start()]);
        out.push_str(rendered.as_deref().unwrap_or_default());
        out.push_str(&tag[found.end()..]);
        return out;
    }
    let Some(rendered) = rendered else {
        return tag.to_string();
    };
    let close = if tag.ends_with("/>") { tag.len() - 2 } else { tag.len() - 1 };
    let body = tag[..close].trim_end();
    format!("{}{}{}", body, rendered, &tag[close..])
}

/// Turn a self-closing tag into a start tag
pub(crate) fn open_tag(tag: &str) -> String {
    match tag.strip_suffix("/>") {
        Some(body) => format!("{}>", body.trim_end()),
        None => tag.to_string(),
    }
}

/// Apply non-overlapping edits to the original document
pub(crate) fn apply_edits(original: &str, mut edits: Vec<Edit>, format: &'static str) -> Result<String, ParseError> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(original.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            return Err(ParseError::new(format, None, "overlapping edits while writing targets"));
        }
        out.push_str(&original[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&original[cursor..]);
    Ok(out)
}
