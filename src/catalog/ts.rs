/*!
 * Qt Linguist TS adapter.
 *
 * Each `<message>` becomes one unit, or one unit per `<numerusform>` for
 * numerus messages. `type="unfinished"` on `<translation>` is the review flag;
 * vanished and obsolete messages are left alone.
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

static TYPE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+type\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("Invalid type attribute regex")
});

const FORMAT: &str = "TS";

/// Reads and writes Qt TS files
#[derive(Debug, Clone, Copy, Default)]
pub struct TsAdapter;

#[derive(Debug, Default)]
struct MessageBuilder {
    numerus: bool,
    source: Option<String>,
    source_tags: Vec<String>,
    comments: Vec<String>,
    locations: Vec<String>,
    translation: Option<Element>,
    text: String,
    forms: Vec<Element>,
    form_texts: Vec<String>,
    fuzzy: bool,
    retired: bool,
    indent: String,
    last_child_end: usize,
}

impl FormatAdapter for TsAdapter {
    fn format(&self) -> CatalogFormat {
        CatalogFormat::Ts
    }

    fn parse(&self, bytes: &[u8]) -> Result<Catalog, ParseError> {
        let decoded = decode_utf8(CatalogFormat::Ts, bytes)?;
        let src = decoded.text.as_str();
        let mut cursor = XmlCursor::new(src, FORMAT);

        let mut stack: Vec<String> = Vec::new();
        let mut root_seen = false;
        let mut metadata = Vec::new();
        let mut context_name: Option<String> = None;
        let mut message: Option<MessageBuilder> = None;
        let mut units: Vec<TranslationUnit> = Vec::new();
        let mut groups: Vec<TargetGroup> = Vec::new();

        loop {
            let (event, span) = cursor.next()?;
            let (element, empty) = match event {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => {
                    match stack.pop().as_deref() {
                        Some("message") => {
                            if let Some(builder) = message.take() {
                                finish_message(builder, context_name.clone(), &mut units, &mut groups)
                                    .map_err(|msg| cursor.error_at(span.start, msg))?;
                            }
                        }
                        Some("context") => context_name = None,
                        _ => {}
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
                (None, "TS") => {
                    root_seen = true;
                    for key in ["version", "language", "sourcelanguage"] {
                        if let Some(value) = attr(key)? {
                            metadata.push((key.to_string(), value));
                        }
                    }
                }
                (None, other) => {
                    return Err(cursor.error_at(span.start, format!("missing <TS> root, found <{}>", other)));
                }
                (Some("context"), "name") if !empty => {
                    context_name = Some(cursor.read_inner(&span)?.text);
                    continue;
                }
                (Some("context"), "message") => {
                    message = Some(MessageBuilder {
                        numerus: attr("numerus")?.as_deref() == Some("yes"),
                        last_child_end: span.end,
                        ..Default::default()
                    });
                    if empty {
                        return Err(cursor.error_at(span.start, "message without <source>"));
                    }
                }
                (Some("message"), child) => {
                    let builder = message
                        .as_mut()
                        .ok_or_else(|| cursor.error_at(span.start, "element outside of <message>"))?;
                    let mut end = span.end;
                    match child {
                        "location" => {
                            let file = attr("filename")?.unwrap_or_default();
                            let location = match attr("line")? {
                                Some(line) => format!("{}:{}", file, line),
                                None => file,
                            };
                            if !location.is_empty() {
                                builder.locations.push(location);
                            }
                            if !empty {
                                end = cursor.read_inner(&span)?.end;
                            }
                        }
                        "source" => {
                            builder.indent = indent_before(src, span.start);
                            if empty {
                                builder.source = Some(String::new());
                            } else {
                                let inner = cursor.read_inner(&span)?;
                                builder.source = Some(inner.text);
                                builder.source_tags = inner.tags;
                                end = inner.end;
                            }
                        }
                        "comment" | "extracomment" | "translatorcomment" if !empty => {
                            let inner = cursor.read_inner(&span)?;
                            if !inner.text.trim().is_empty() {
                                builder.comments.push(inner.text);
                            }
                            end = inner.end;
                        }
                        "translation" => {
                            let kind = attr("type")?;
                            builder.fuzzy = kind.as_deref() == Some("unfinished");
                            builder.retired = matches!(kind.as_deref(), Some("vanished") | Some("obsolete"));
                            let element_name = qualified_name(&element);
                            if empty {
                                builder.translation = Some(Element { name: element_name, tag: span.clone(), content: None });
                            } else if builder.numerus {
                                let (content, close_end) = read_numerus_forms(&mut cursor, span.end, builder)?;
                                builder.translation = Some(Element { name: element_name, tag: span.clone(), content: Some(content) });
                                end = close_end;
                            } else {
                                let inner = cursor.read_inner(&span)?;
                                builder.text = inner.text;
                                builder.translation = Some(Element {
                                    name: element_name,
                                    tag: span.clone(),
                                    content: Some(inner.content),
                                });
                                end = inner.end;
                            }
                        }
                        _ if !empty => end = cursor.read_inner(&span)?.end,
                        _ => {}
                    }
                    builder.last_child_end = end;
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
            return Err(ParseError::new(FORMAT, None, "missing <TS> root"));
        }

        let newline = if src.contains("\r\n") { "\r\n" } else { "\n" };
        let language = |key: &str| {
            metadata
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };
        let target_language = language("language");
        let source_language = language("sourcelanguage");

        let mut catalog = Catalog::new(
            CatalogFormat::Ts,
            decoded,
            units,
            Layout::Ts(XmlLayout { newline, groups }),
        );
        catalog.metadata = metadata;
        catalog.source_language = source_language;
        catalog.target_language = target_language;
        Ok(catalog)
    }

    fn serialize(&self, catalog: &Catalog) -> Result<Vec<u8>, ParseError> {
        let Layout::Ts(layout) = catalog.layout() else {
            return Err(ParseError::new(FORMAT, None, "catalog was not parsed from a TS file"));
        };
        let original = catalog.original();
        let mut edits = Vec::new();

        for group in &layout.groups {
            let units = catalog.units.get(group.units.clone()).ok_or_else(|| {
                ParseError::new(FORMAT, None, "unit list no longer matches the parsed catalog")
            })?;
            if !units.iter().any(|u| u.is_modified()) {
                continue;
            }
            let fuzzy = units.iter().any(|u| u.fuzzy);
            let was_fuzzy = units.iter().any(|u| u.original_fuzzy());
            let type_value = fuzzy.then_some("unfinished");
            let render = |unit: &TranslationUnit| escape_with_tags(&unit.target_text, &group.inline_tags);
            let body = if group.numerus {
                units
                    .iter()
                    .map(|u| format!("<numerusform>{}</numerusform>", render(u)))
                    .collect::<String>()
            } else {
                render(&units[0])
            };

            match &group.element {
                None => {
                    let attrs = if fuzzy { " type=\"unfinished\"" } else { "" };
                    edits.push(Edit::insert(
                        group.insert_at,
                        format!("{}{}<{}{}>{}</{}>", layout.newline, group.indent, group.name, attrs, body, group.name),
                    ));
                }
                Some(element) => match &element.content {
                    None => {
                        let tag = set_attribute(&original[element.tag.clone()], &TYPE_ATTR, "type", type_value);
                        edits.push(Edit::new(
                            element.tag.clone(),
                            format!("{}{}</{}>", open_tag(&tag), body, element.name),
                        ));
                    }
                    Some(content) => {
                        if fuzzy != was_fuzzy {
                            let tag = set_attribute(&original[element.tag.clone()], &TYPE_ATTR, "type", type_value);
                            edits.push(Edit::new(element.tag.clone(), tag));
                        }
                        if group.numerus && !group.forms.is_empty() {
                            for (unit, form) in units.iter().zip(&group.forms) {
                                if unit.target_text == unit.original_target() {
                                    continue;
                                }
                                match &form.content {
                                    Some(range) => edits.push(Edit::new(range.clone(), render(unit))),
                                    None => edits.push(Edit::new(
                                        form.tag.clone(),
                                        format!("{}{}</{}>", open_tag(&original[form.tag.clone()]), render(unit), form.name),
                                    )),
                                }
                            }
                        } else if units.iter().any(|u| u.target_text != u.original_target()) {
                            edits.push(Edit::new(content.clone(), body));
                        }
                    }
                },
            }
        }

        let text = apply_edits(original, edits, FORMAT)?;
        Ok(catalog.finish_bytes(text))
    }
}

/// Read the `<numerusform>` children of a numerus `<translation>`; returns its content span and end
fn read_numerus_forms(
    cursor: &mut XmlCursor<'_>,
    content_start: usize,
    builder: &mut MessageBuilder,
) -> Result<(std::ops::Range<usize>, usize), ParseError> {
    loop {
        let (event, span) = cursor.next()?;
        match event {
            Event::Start(e) if local_name(&e) == "numerusform" => {
                let inner = cursor.read_inner(&span)?;
                builder.forms.push(Element {
                    name: qualified_name(&e),
                    tag: span,
                    content: Some(inner.content),
                });
                builder.form_texts.push(inner.text);
            }
            Event::Empty(e) if local_name(&e) == "numerusform" => {
                builder.forms.push(Element { name: qualified_name(&e), tag: span, content: None });
                builder.form_texts.push(String::new());
            }
            Event::Start(_) => {
                cursor.read_inner(&span)?;
            }
            Event::End(_) => return Ok((content_start..span.start, span.end)),
            Event::Eof => return Err(cursor.error_at(content_start, "<translation> is never closed")),
            _ => {}
        }
    }
}

fn finish_message(
    builder: MessageBuilder,
    context: Option<String>,
    units: &mut Vec<TranslationUnit>,
    groups: &mut Vec<TargetGroup>,
) -> Result<(), String> {
    if builder.retired {
        return Ok(());
    }
    let source = builder.source.ok_or_else(|| "message has no <source>".to_string())?;
    let location = (!builder.locations.is_empty()).then(|| builder.locations.join(" "));
    let start = units.len();

    let forms = if builder.numerus { builder.forms.len().max(1) } else { 1 };
    for form in 0..forms {
        let target = if builder.numerus {
            builder.form_texts.get(form).cloned().unwrap_or_default()
        } else {
            builder.text.clone()
        };
        let mut unit = TranslationUnit::new(source.clone(), target)
            .with_context(context.clone())
            .with_fuzzy(builder.fuzzy);
        unit.comments = builder.comments.clone();
        unit.location = location.clone();
        unit.plural_index = builder.numerus.then_some(form);
        units.push(unit);
    }

    groups.push(TargetGroup {
        units: start..units.len(),
        name: "translation".to_string(),
        element: builder.translation,
        forms: builder.forms,
        numerus: builder.numerus,
        insert_at: builder.last_child_end,
        indent: builder.indent,
        inline_tags: builder.source_tags,
    });
    Ok(())
}
