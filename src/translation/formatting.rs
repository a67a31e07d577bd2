/*!
 * Text shaping around the backend call.
 *
 * Backends tend to drop leading and trailing whitespace, and AI backends like
 * to wrap answers in quotes. The helpers here cut the padding off before
 * dispatch, put it back afterwards and undo the usual decorations.
 */

/// Whitespace surrounding the translatable core of a text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Padding {
    pub leading: String,
    pub trailing: String,
}

impl Padding {
    /// Split `text` into padding and its trimmed core
    pub fn split(text: &str) -> (Self, &str) {
        let core = text.trim();
        if core.is_empty() {
            return (
                Self {
                    leading: text.to_string(),
                    trailing: String::new(),
                },
                core,
            );
        }
        let start = text.len() - text.trim_start().len();
        let end = start + core.len();
        (
            Self {
                leading: text[..start].to_string(),
                trailing: text[end..].to_string(),
            },
            core,
        )
    }

    /// Re-apply the padding to a translated core
    pub fn restore(&self, translated: &str) -> String {
        format!("{}{}{}", self.leading, translated.trim(), self.trailing)
    }
}

/// Remove a pair of quotes an AI backend added around its answer
pub fn strip_added_quotes<'a>(source: &str, translated: &'a str) -> &'a str {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('“', '”'), ('«', '»'), ('\'', '\'')];
    let trimmed = translated.trim();
    for (open, close) in PAIRS {
        let source_quoted = source.starts_with(open) && source.ends_with(close);
        if !source_quoted && trimmed.chars().count() >= 2 {
            if let Some(inner) = trimmed.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
                return inner;
            }
        }
    }
    trimmed
}

/// Make line breaks in a translation match the source's style
pub fn match_line_endings(source: &str, translated: &str) -> String {
    if source.contains("\r\n") {
        translated.replace("\r\n", "\n").replace('\n', "\r\n")
    } else if source.contains('\n') {
        translated.replace("\r\n", "\n")
    } else {
        translated.to_string()
    }
}
