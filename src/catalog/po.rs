/*!
 * gettext PO adapter.
 *
 * The file is split into blank-line separated entries. Entries whose units
 * did not change are copied from the original text untouched; a changed entry
 * keeps every line except its `msgstr` lines and, when the review state
 * flipped, its `#,` flags and `#|` previous-msgid lines.
 */

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Catalog, CatalogFormat, FormatAdapter, Layout, TranslationUnit, decode_utf8};
use crate::errors::ParseError;

static KEYWORD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(msgctxt|msgid_plural|msgid|msgstr)(?:\[(\d+)\])?\s*(.*)$").expect("Invalid PO keyword regex")
});

static NPLURALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"nplurals\s*=\s*(\d+)").expect("Invalid nplurals regex")
});

const FORMAT: &str = "PO";

/// Reads and writes gettext PO files
#[derive(Debug, Clone, Copy, Default)]
pub struct PoAdapter;

#[derive(Debug, Clone)]
pub(crate) struct PoLayout {
    newline: &'static str,
    entries: Vec<EntryLayout>,
}

/// Where one translatable entry lives in the original text
#[derive(Debug, Clone)]
struct EntryLayout {
    /// Byte range of the entry, without the terminator of its last line
    span: Range<usize>,
    lines: Vec<String>,
    units: Range<usize>,
    plural: bool,
    fuzzy: bool,
    flags_line: Option<usize>,
    previous_lines: Vec<usize>,
    first_keyword: usize,
    msgstr_lines: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Context,
    Id,
    IdPlural,
    Str(usize),
}

#[derive(Debug, Default)]
struct RawEntry {
    line_no: usize,
    span: Range<usize>,
    lines: Vec<String>,
    fuzzy: bool,
    flags_line: Option<usize>,
    previous_lines: Vec<usize>,
    comments: Vec<String>,
    locations: Vec<String>,
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgid_plural: Option<String>,
    msgstr: Vec<(Option<usize>, String)>,
    first_keyword: Option<usize>,
    msgstr_lines: Option<Range<usize>>,
    obsolete: bool,
}

impl RawEntry {
    fn is_header(&self) -> bool {
        self.msgctxt.is_none() && self.msgid_plural.is_none() && self.msgid.as_deref() == Some("")
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Context => self.msgctxt.get_or_insert_with(String::new),
            Field::Id => self.msgid.get_or_insert_with(String::new),
            Field::IdPlural => self.msgid_plural.get_or_insert_with(String::new),
            Field::Str(slot) => &mut self.msgstr[slot].1,
        }
    }
}

struct RawLine<'a> {
    content: &'a str,
    start: usize,
    end: usize,
}

fn split_lines(text: &str) -> Vec<RawLine<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for chunk in text.split_inclusive('\n') {
        let content = chunk.trim_end_matches('\n').trim_end_matches('\r');
        lines.push(RawLine {
            content,
            start: offset,
            end: offset + content.len(),
        });
        offset += chunk.len();
    }
    lines
}

fn err(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::new(FORMAT, Some(line), message)
}

/// Unescape the body of a PO string literal, including its surrounding quotes
fn parse_quoted(literal: &str, line: usize) -> Result<String, ParseError> {
    let literal = literal.trim();
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| err(line, format!("expected a quoted string, found `{}`", literal)))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('a') => out.push('\u{07}'),
                Some('b') => out.push('\u{08}'),
                Some('f') => out.push('\u{0C}'),
                Some('v') => out.push('\u{0B}'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(err(line, "unbalanced quotes: string ends with an escape")),
            },
            '"' => return Err(err(line, "unbalanced quotes: unescaped quote inside string")),
            _ => out.push(c),
        }
    }
    Ok(out)
}

pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `keyword "value"`, switching to the multi-line form for embedded newlines
fn render_keyword(keyword: &str, value: &str) -> Vec<String> {
    let segments: Vec<&str> = value.split_inclusive('\n').collect();
    if segments.len() <= 1 {
        return vec![format!("{} \"{}\"", keyword, escape(value))];
    }
    let mut lines = vec![format!("{} \"\"", keyword)];
    lines.extend(segments.iter().map(|s| format!("\"{}\"", escape(s))));
    lines
}

fn parse_entry(lines: &[RawLine<'_>], block: Range<usize>) -> Result<RawEntry, ParseError> {
    let mut entry = RawEntry {
        line_no: block.start + 1,
        span: lines[block.start].start..lines[block.end - 1].end,
        ..Default::default()
    };
    let mut current: Option<Field> = None;

    for (offset, raw) in lines[block.clone()].iter().enumerate() {
        let line_no = block.start + offset + 1;
        let content = raw.content.trim();
        entry.lines.push(raw.content.to_string());

        if content.starts_with("#~") {
            entry.obsolete = true;
            current = None;
        } else if let Some(rest) = content.strip_prefix("#,") {
            entry.flags_line = Some(offset);
            entry.fuzzy |= rest.split(',').any(|f| f.trim() == "fuzzy");
        } else if let Some(rest) = content.strip_prefix("#:") {
            entry.locations.push(rest.trim().to_string());
        } else if content.starts_with("#|") {
            entry.previous_lines.push(offset);
        } else if let Some(rest) = content.strip_prefix('#') {
            let rest = rest.strip_prefix('.').unwrap_or(rest);
            entry.comments.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        } else if content.starts_with('"') {
            let field = current.ok_or_else(|| err(line_no, "string continuation without a keyword"))?;
            let value = parse_quoted(content, line_no)?;
            entry.field_mut(field).push_str(&value);
            if let (Field::Str(_), Some(range)) = (field, entry.msgstr_lines.as_mut()) {
                range.end = offset + 1;
            }
        } else if let Some(caps) = KEYWORD_LINE.captures(content) {
            let index = caps.get(2).map(|m| m.as_str().parse::<usize>()).transpose()
                .map_err(|_| err(line_no, "invalid plural index"))?;
            let value = parse_quoted(&caps[3], line_no)?;
            entry.first_keyword.get_or_insert(offset);

            let field = match (&caps[1], index) {
                ("msgctxt", None) => Field::Context,
                ("msgid", None) => Field::Id,
                ("msgid_plural", None) => Field::IdPlural,
                ("msgstr", index) => {
                    if entry.msgid.is_none() {
                        return Err(err(line_no, "msgstr without msgid"));
                    }
                    if index.is_some() != entry.msgid_plural.is_some() {
                        return Err(err(line_no, "msgstr form does not match msgid_plural"));
                    }
                    match entry.msgstr_lines.as_mut() {
                        Some(range) if range.end == offset => range.end = offset + 1,
                        Some(_) => return Err(err(line_no, "msgstr lines must be contiguous")),
                        None => entry.msgstr_lines = Some(offset..offset + 1),
                    }
                    entry.msgstr.push((index, String::new()));
                    Field::Str(entry.msgstr.len() - 1)
                }
                (keyword, _) => return Err(err(line_no, format!("unexpected index on {}", keyword))),
            };

            let duplicate = match field {
                Field::Context => entry.msgctxt.is_some(),
                Field::Id => entry.msgid.is_some(),
                Field::IdPlural => entry.msgid_plural.is_some(),
                Field::Str(_) => false,
            };
            if duplicate {
                return Err(err(line_no, format!("duplicate {}", &caps[1])));
            }
            if matches!(field, Field::Context | Field::Id) && !entry.msgstr.is_empty() {
                return Err(err(line_no, "missing blank line between entries"));
            }
            entry.field_mut(field).push_str(&value);
            current = Some(field);
        } else {
            return Err(err(line_no, format!("unrecognized line `{}`", content)));
        }
    }

    if entry.first_keyword.is_some() {
        if entry.msgid.is_none() {
            return Err(err(entry.line_no, "entry has no msgid"));
        }
        if entry.msgstr.is_empty() {
            return Err(err(entry.line_no, "msgid without msgstr"));
        }
    }
    Ok(entry)
}

fn parse_header(value: &str) -> Vec<(String, String)> {
    value
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

impl FormatAdapter for PoAdapter {
    fn format(&self) -> CatalogFormat {
        CatalogFormat::Po
    }

    fn parse(&self, bytes: &[u8]) -> Result<Catalog, ParseError> {
        let decoded = decode_utf8(CatalogFormat::Po, bytes)?;
        let text = decoded.text.as_str();
        let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = split_lines(text);

        let mut raw_entries = Vec::new();
        let mut block_start: Option<usize> = None;
        for (i, line) in lines.iter().enumerate() {
            let blank = line.content.trim().is_empty();
            match (blank, block_start) {
                (false, None) => block_start = Some(i),
                (true, Some(start)) => {
                    raw_entries.push(parse_entry(&lines, start..i)?);
                    block_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = block_start {
            raw_entries.push(parse_entry(&lines, start..lines.len())?);
        }

        let mut metadata = Vec::new();
        let mut translatable = Vec::new();
        for entry in raw_entries {
            if entry.first_keyword.is_none() || (entry.obsolete && entry.msgid.is_none()) {
                continue;
            }
            if entry.is_header() && metadata.is_empty() {
                let header = entry.msgstr.first().map(|(_, v)| v.as_str()).unwrap_or_default();
                metadata = parse_header(header);
                continue;
            }
            translatable.push(entry);
        }

        let nplurals = metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Plural-Forms"))
            .and_then(|(_, v)| NPLURALS.captures(v))
            .and_then(|c| c[1].parse::<usize>().ok())
            .unwrap_or(0);

        let mut units = Vec::new();
        let mut entries = Vec::new();
        for raw in translatable {
            let unit_start = units.len();
            let plural = raw.msgid_plural.is_some();
            let location = (!raw.locations.is_empty()).then(|| raw.locations.join(" "));
            let msgid = raw.msgid.clone().unwrap_or_default();

            let forms = if plural {
                let present = raw.msgstr.iter().filter_map(|(i, _)| *i).max().map_or(0, |m| m + 1);
                present.max(nplurals)
            } else {
                1
            };

            for form in 0..forms {
                let (source, target) = if plural {
                    let source = if form == 0 { msgid.clone() } else { raw.msgid_plural.clone().unwrap_or_default() };
                    let target = raw.msgstr.iter()
                        .find(|(i, _)| *i == Some(form))
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default();
                    (source, target)
                } else {
                    (msgid.clone(), raw.msgstr[0].1.clone())
                };
                let mut unit = TranslationUnit::new(source, target)
                    .with_context(raw.msgctxt.clone())
                    .with_fuzzy(raw.fuzzy);
                unit.comments = raw.comments.clone();
                unit.location = location.clone();
                unit.plural_index = plural.then_some(form);
                units.push(unit);
            }

            entries.push(EntryLayout {
                span: raw.span,
                lines: raw.lines,
                units: unit_start..units.len(),
                plural,
                fuzzy: raw.fuzzy,
                flags_line: raw.flags_line,
                previous_lines: raw.previous_lines,
                first_keyword: raw.first_keyword.unwrap_or(0),
                msgstr_lines: raw.msgstr_lines.unwrap_or(0..0),
            });
        }

        let target_language = metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Language"))
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty());

        let mut catalog = Catalog::new(
            CatalogFormat::Po,
            decoded,
            units,
            Layout::Po(PoLayout { newline, entries }),
        );
        catalog.metadata = metadata;
        catalog.target_language = target_language;
        Ok(catalog)
    }

    fn serialize(&self, catalog: &Catalog) -> Result<Vec<u8>, ParseError> {
        let Layout::Po(layout) = catalog.layout() else {
            return Err(ParseError::new(FORMAT, None, "catalog was not parsed from a PO file"));
        };
        let original = catalog.original();
        let mut out = String::with_capacity(original.len() + 256);
        let mut cursor = 0;

        for entry in &layout.entries {
            let units = catalog.units.get(entry.units.clone()).ok_or_else(|| {
                ParseError::new(FORMAT, None, "unit list no longer matches the parsed catalog")
            })?;
            if !units.iter().any(|u| u.is_modified()) {
                continue;
            }
            out.push_str(&original[cursor..entry.span.start]);
            out.push_str(&render_entry(entry, units).join(layout.newline));
            cursor = entry.span.end;
        }
        out.push_str(&original[cursor..]);
        Ok(catalog.finish_bytes(out))
    }
}

fn render_flags(line: &str, fuzzy: bool) -> Option<String> {
    let rest = line.trim_start().strip_prefix("#,").unwrap_or_default();
    let mut flags: Vec<&str> = rest
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty() && *f != "fuzzy")
        .collect();
    if fuzzy {
        flags.insert(0, "fuzzy");
    }
    (!flags.is_empty()).then(|| format!("#, {}", flags.join(", ")))
}

fn render_entry(entry: &EntryLayout, units: &[TranslationUnit]) -> Vec<String> {
    let fuzzy = units.iter().any(|u| u.fuzzy);
    let fuzzy_changed = fuzzy != entry.fuzzy;
    let insert_flag_at = entry
        .previous_lines
        .first()
        .copied()
        .unwrap_or(entry.first_keyword)
        .min(entry.first_keyword);

    let mut out = Vec::with_capacity(entry.lines.len() + units.len());
    for (i, line) in entry.lines.iter().enumerate() {
        if fuzzy_changed && fuzzy && entry.flags_line.is_none() && i == insert_flag_at {
            out.push("#, fuzzy".to_string());
        }
        if i == entry.msgstr_lines.start {
            if entry.plural {
                for (form, unit) in units.iter().enumerate() {
                    out.extend(render_keyword(&format!("msgstr[{}]", form), &unit.target_text));
                }
            } else {
                out.extend(render_keyword("msgstr", &units[0].target_text));
            }
        }
        if entry.msgstr_lines.contains(&i) {
            continue;
        }
        if fuzzy_changed && entry.flags_line == Some(i) {
            out.extend(render_flags(line, fuzzy));
            continue;
        }
        if fuzzy_changed && !fuzzy && entry.previous_lines.contains(&i) {
            continue;
        }
        out.push(line.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# German translation
msgid ""
msgstr ""
"Language: de\n"
"Content-Type: text/plain; charset=UTF-8\n"
"Plural-Forms: nplurals=2; plural=(n != 1);\n"

#: src/main.c:10
msgid "Hello {0}"
msgstr ""

#. Shown in the title bar
#, fuzzy, c-format
#| msgid "Old %d file"
msgid "%d file"
msgid_plural "%d files"
msgstr[0] "%d Datei"
msgstr[1] ""

msgctxt "menu"
msgid "Open"
msgstr "Öffnen"

#~ msgid "Gone"
#~ msgstr "Weg"
"#;

    fn parse(text: &str) -> Catalog {
        PoAdapter.parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn parse_extracts_units_and_header() {
        let catalog = parse(SAMPLE);
        assert_eq!(catalog.units.len(), 4);
        assert_eq!(catalog.target_language.as_deref(), Some("de"));
        assert_eq!(catalog.metadata_value("content-type"), Some("text/plain; charset=UTF-8"));

        let hello = &catalog.units[0];
        assert_eq!(hello.source_text, "Hello {0}");
        assert_eq!(hello.location.as_deref(), Some("src/main.c:10"));

        let singular = &catalog.units[1];
        assert_eq!(singular.plural_index, Some(0));
        assert!(singular.fuzzy);
        assert_eq!(singular.comments, vec!["Shown in the title bar".to_string()]);
        assert_eq!(catalog.units[2].source_text, "%d files");
        assert_eq!(catalog.units[2].target_text, "");

        assert_eq!(catalog.units[3].context.as_deref(), Some("menu"));
        assert_eq!(catalog.units[3].target_text, "Öffnen");
    }

    #[test]
    fn unmodified_catalog_round_trips_exactly() {
        let catalog = parse(SAMPLE);
        assert_eq!(PoAdapter.serialize(&catalog).unwrap(), SAMPLE.as_bytes());

        let crlf = SAMPLE.replace('\n', "\r\n");
        let catalog = parse(&crlf);
        assert_eq!(PoAdapter.serialize(&catalog).unwrap(), crlf.as_bytes());
    }

    #[test]
    fn translated_entry_only_rewrites_msgstr() {
        let mut catalog = parse(SAMPLE);
        catalog.units[0].set_translation("Hallo {0}");
        let out = String::from_utf8(PoAdapter.serialize(&catalog).unwrap()).unwrap();
        let expected = SAMPLE.replace(
            "msgid \"Hello {0}\"\nmsgstr \"\"",
            "msgid \"Hello {0}\"\nmsgstr \"Hallo {0}\"",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn clearing_fuzzy_drops_flag_and_previous_msgid() {
        let mut catalog = parse(SAMPLE);
        catalog.units[1].set_translation("%d Datei");
        catalog.units[2].set_translation("%d Dateien");
        let out = String::from_utf8(PoAdapter.serialize(&catalog).unwrap()).unwrap();
        assert!(out.contains("#, c-format\nmsgid \"%d file\""));
        assert!(!out.contains("#|"));
        assert!(out.contains("msgstr[0] \"%d Datei\"\nmsgstr[1] \"%d Dateien\""));
    }

    #[test]
    fn marking_fuzzy_inserts_flag_line() {
        let mut catalog = parse(SAMPLE);
        catalog.units[0].target_text = "Hallo {0}".to_string();
        catalog.units[0].fuzzy = true;
        let out = String::from_utf8(PoAdapter.serialize(&catalog).unwrap()).unwrap();
        assert!(out.contains("#: src/main.c:10\n#, fuzzy\nmsgid \"Hello {0}\""));
    }

    #[test]
    fn multiline_values_use_continuation_form() {
        let text = "msgid \"\"\n\"Line one\\n\"\n\"Line two\"\nmsgstr \"\"\n";
        let mut catalog = parse(text);
        assert_eq!(catalog.units[0].source_text, "Line one\nLine two");
        catalog.units[0].set_translation("Zeile \"eins\"\nZeile zwei");
        let out = String::from_utf8(PoAdapter.serialize(&catalog).unwrap()).unwrap();
        assert!(out.ends_with("msgstr \"\"\n\"Zeile \\\"eins\\\"\\n\"\n\"Zeile zwei\"\n"));
    }

    #[test]
    fn plural_forms_follow_header_count() {
        let text = "msgid \"\"\nmsgstr \"Plural-Forms: nplurals=3; plural=0;\\n\"\n\nmsgid \"a\"\nmsgid_plural \"as\"\nmsgstr[0] \"\"\n";
        let catalog = parse(text);
        assert_eq!(catalog.units.len(), 3);
        assert_eq!(catalog.units[2].plural_index, Some(2));
    }

    #[test]
    fn malformed_input_is_rejected_with_line_numbers() {
        let err = PoAdapter.parse(b"msgid \"open\nmsgstr \"\"\n").unwrap_err();
        assert_eq!(err.line, Some(1));

        let err = PoAdapter.parse(b"msgid \"a\"\n").unwrap_err();
        assert!(err.message.contains("without msgstr"));

        let err = PoAdapter.parse(b"msgid \"a\"\nmsgstr \"b\"\ngarbage\n").unwrap_err();
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn bom_survives_round_trip() {
        let bytes = b"\xEF\xBB\xBFmsgid \"a\"\nmsgstr \"\"\n";
        let mut catalog = PoAdapter.parse(bytes).unwrap();
        assert_eq!(PoAdapter.serialize(&catalog).unwrap(), bytes.to_vec());
        catalog.units[0].set_translation("b");
        assert!(PoAdapter.serialize(&catalog).unwrap().starts_with(b"\xEF\xBB\xBF"));
    }
}
