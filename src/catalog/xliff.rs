/*!
 * XLIFF 1.2 adapter.
 *
 * Units are the `<trans-unit>` elements of every `<file>`. A target counts as
 * final when its `state` is `translated`, `final` or `signed-off`, or when it
 * has text and no state at all; anything else is up for review.
 */

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use regex::Regex;

use super::xml::{
    Edit, Element, TargetGroup, XmlCursor, XmlLayout, apply_edits, attribute, escape_with_tags,
    indent_before, local_name, open_tag, qualified_name, set_attribute,
};
use super::{Catalog, CatalogFormat, FormatAdapter, Layout, TranslationUnit, decode_utf8};
use crate::errors::ParseError;

static STATE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+state\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("Invalid state attribute regex")
});

const FORMAT: &str = "XLIFF";
const STATE_TRANSLATED: &str = "translated";
const STATE_REVIEW: &str = "needs-review-translation";

/// Reads and writes XLIFF 1.2 files
#[derive(Debug, Clone, Copy, Default)]
pub struct XliffAdapter;

#[derive(Debug, Default)]
struct UnitBuilder {
    id: Option<String>,
    resname: Option<String>,
    skip: bool,
    source: Option<String>,
    source_name: String,
    inline_tags: Vec<String>,
    target: Option<Element>,
    target_text: String,
    state: Option<String>,
    notes: Vec<String>,
    source_file: Option<String>,
    line_number: Option<String>,
    indent: String,
    insert_at: usize,
}

fn is_final_state(state: &str) -> bool {
    matches!(state, "translated" | "final" | "signed-off")
}

impl FormatAdapter for XliffAdapter {
    fn format(&self) -> CatalogFormat {
        CatalogFormat::Xliff
    }

    fn parse(&self, bytes: &[u8]) -> Result<Catalog, ParseError> {
        let decoded = decode_utf8(CatalogFormat::Xliff, bytes)?;
        let src = decoded.text.as_str();
        let mut cursor = XmlCursor::new(src, FORMAT);

        let mut stack: Vec<String> = Vec::new();
        let mut root_seen = false;
        let mut file_seen = false;
        let mut metadata = Vec::new();
        let mut source_language = None;
        let mut target_language = None;
        let mut unit: Option<UnitBuilder> = None;
        let mut units: Vec<TranslationUnit> = Vec::new();
        let mut groups: Vec<TargetGroup> = Vec::new();

        loop {
            let (event, span) = cursor.next()?;
            let (element, empty) = match event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => {
                    if stack.pop().as_deref() == Some("trans-unit") {
                        if let Some(builder) = unit.take() {
                            finish_unit(builder, &mut units, &mut groups)
                                .map_err(|msg| cursor.error_at(span.start, msg))?;
                        }
                    }
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            let name = local_name(&element);
            let parent = stack.last().map(String::as_str);
            let attr = |key: &str| attribute(&element, key).map_err(|e| cursor.error_at(span.start, e));

            match (parent, name.as_str()) {
                (None, "xliff") => {
                    root_seen = true;
                    if let Some(version) = attr("version")? {
                        metadata.push(("version".to_string(), version));
                    }
                }
                (None, other) => {
                    return Err(cursor.error_at(span.start, format!("missing <xliff> root, found <{}>", other)));
                }
                (_, "file") => {
                    file_seen = true;
                    if source_language.is_none() {
                        source_language = attr("source-language")?;
                    }
                    if target_language.is_none() {
                        target_language = attr("target-language")?;
                    }
                    for key in ["original", "datatype"] {
                        if let Some(value) = attr(key)? {
                            metadata.push((key.to_string(), value));
                        }
                    }
                }
                (_, "trans-unit") => {
                    if empty {
                        return Err(cursor.error_at(span.start, "trans-unit without <source>"));
                    }
                    unit = Some(UnitBuilder {
                        id: attr("id")?,
                        resname: attr("resname")?,
                        skip: attr("translate")?.as_deref() == Some("no"),
                        ..Default::default()
                    });
                }
                (Some("trans-unit"), child) => {
                    let builder = unit
                        .as_mut()
                        .ok_or_else(|| cursor.error_at(span.start, "element outside of <trans-unit>"))?;
                    let consumed = match child {
                        "source" | "seg-source" => {
                            if child == "source" {
                                builder.indent = indent_before(src, span.start);
                                builder.source_name = qualified_name(&element);
                            }
                            let (text, tags, end) = if empty {
                                (String::new(), Vec::new(), span.end)
                            } else {
                                let inner = cursor.read_inner(&span)?;
                                (inner.text, inner.tags, inner.end)
                            };
                            if child == "source" {
                                builder.source = Some(text);
                            }
                            for tag in tags {
                                if !builder.inline_tags.contains(&tag) {
                                    builder.inline_tags.push(tag);
                                }
                            }
                            builder.insert_at = builder.insert_at.max(end);
                            true
                        }
                        "target" => {
                            builder.state = attr("state")?;
                            let element_name = qualified_name(&element);
                            if empty {
                                builder.target = Some(Element { name: element_name, tag: span.clone(), content: None });
                            } else {
                                let inner = cursor.read_inner(&span)?;
                                builder.target_text = inner.text;
                                for tag in inner.tags {
                                    if !builder.inline_tags.contains(&tag) {
                                        builder.inline_tags.push(tag);
                                    }
                                }
                                builder.target = Some(Element {
                                    name: element_name,
                                    tag: span.clone(),
                                    content: Some(inner.content),
                                });
                            }
                            true
                        }
                        "note" if !empty => {
                            let note = cursor.read_inner(&span)?.text;
                            if !note.trim().is_empty() {
                                builder.notes.push(note);
                            }
                            true
                        }
                        _ => false,
                    };
                    if consumed {
                        continue;
                    }
                }
                (Some("context-group"), "context") if !empty => {
                    let kind = attr("context-type")?;
                    let value = cursor.read_inner(&span)?.text;
                    if let Some(builder) = unit.as_mut() {
                        match kind.as_deref() {
                            Some("sourcefile") => builder.source_file = Some(value),
                            Some("linenumber") => builder.line_number = Some(value),
                            _ => {}
                        }
                    }
                    continue;
                }
                _ => {}
            }

            if !empty {
                stack.push(name);
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::new(FORMAT, None, format!("unclosed <{}> at end of file", open)));
        }
        if !root_seen {
            return Err(ParseError::new(FORMAT, None, "missing <xliff> root"));
        }
        if !file_seen {
            return Err(ParseError::new(FORMAT, None, "document has no <file> element"));
        }

        let newline = if src.contains("\r\n") { "\r\n" } else { "\n" };
        let mut catalog = Catalog::new(
            CatalogFormat::Xliff,
            decoded,
            units,
            Layout::Xliff(XmlLayout { newline, groups }),
        );
        catalog.metadata = metadata;
        catalog.source_language = source_language;
        catalog.target_language = target_language;
        Ok(catalog)
    }

    fn serialize(&self, catalog: &Catalog) -> Result<Vec<u8>, ParseError> {
        let Layout::Xliff(layout) = catalog.layout() else {
            return Err(ParseError::new(FORMAT, None, "catalog was not parsed from an XLIFF file"));
        };
        let original = catalog.original();
        let mut edits = Vec::new();

        for group in &layout.groups {
            let unit = catalog
                .units
                .get(group.units.start)
                .ok_or_else(|| ParseError::new(FORMAT, None, "unit list no longer matches the parsed catalog"))?;
            if !unit.is_modified() {
                continue;
            }
            let state = if unit.fuzzy { STATE_REVIEW } else { STATE_TRANSLATED };
            let body = escape_with_tags(&unit.target_text, &group.inline_tags);

            match &group.element {
                None => edits.push(Edit::insert(
                    group.insert_at,
                    format!(
                        "{}{}<{} state=\"{}\">{}</{}>",
                        layout.newline, group.indent, group.name, state, body, group.name
                    ),
                )),
                Some(element) => {
                    let tag = set_attribute(&original[element.tag.clone()], &STATE_ATTR, "state", Some(state));
                    match &element.content {
                        None => edits.push(Edit::new(
                            element.tag.clone(),
                            format!("{}{}</{}>", open_tag(&tag), body, element.name),
                        )),
                        Some(content) => {
                            edits.push(Edit::new(element.tag.clone(), tag));
                            if unit.target_text != unit.original_target() {
                                edits.push(Edit::new(content.clone(), body));
                            }
                        }
                    }
                }
            }
        }

        let text = apply_edits(original, edits, FORMAT)?;
        Ok(catalog.finish_bytes(text))
    }
}

fn finish_unit(builder: UnitBuilder, units: &mut Vec<TranslationUnit>, groups: &mut Vec<TargetGroup>) -> Result<(), String> {
    if builder.skip {
        return Ok(());
    }
    let source = builder.source.ok_or_else(|| "trans-unit without <source>".to_string())?;
    let fuzzy = match (&builder.target, builder.state.as_deref()) {
        (Some(_), Some(state)) => !is_final_state(state),
        _ => false,
    };
    let location = match (builder.source_file, builder.line_number) {
        (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
        (file, line) => file.or(line),
    };

    let mut unit = TranslationUnit::new(source, builder.target_text)
        .with_context(builder.resname.or_else(|| builder.id.clone()))
        .with_fuzzy(fuzzy);
    unit.comments = builder.notes;
    unit.location = location;
    unit.id = builder.id;

    let target_name = match builder.source_name.strip_suffix("source") {
        Some(prefix) => format!("{}target", prefix),
        None => "target".to_string(),
    };
    let index = units.len();
    units.push(unit);
    groups.push(TargetGroup {
        units: index..index + 1,
        name: target_name,
        element: builder.target,
        forms: Vec::new(),
        numerus: false,
        insert_at: builder.insert_at,
        indent: builder.indent,
        inline_tags: builder.inline_tags,
    });
    Ok(())
}
