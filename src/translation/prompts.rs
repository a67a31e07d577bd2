/*!
 * Prompts for AI backends.
 *
 * A batch is sent as one user message in which every entry is introduced by
 * an `<<ENTRY_n>>` tag and the list is closed with `<<END>>`. The model is
 * asked to answer in the same shape. Answers are mapped back strictly by
 * index: each index must appear exactly once and the end tag must be present,
 * otherwise the whole batch is rejected as malformed.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ServiceError;

static ENTRY_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<<\s*ENTRY_(\d+)\s*>>").expect("Invalid entry tag regex")
});

/// Tag closing a batch
pub const END_TAG: &str = "<<END>>";

/// Tag introducing entry `index`
pub fn entry_tag(index: usize) -> String {
    format!("<<ENTRY_{}>>", index)
}

const SYSTEM_PROMPT: &str = r#"You are a professional translator for software localization.
Translate user interface strings from {source_language} to {target_language} accurately and concisely.

Rules:
- Every entry starts with a tag like <<ENTRY_0>>. Answer with the same tags, one translation per tag.
- Finish your answer with <<END>> on its own line.
- Markers such as ⟦0⟧ stand for placeholders. Copy every marker unchanged; you may move it where the grammar requires.
- Do not merge, split, skip or explain entries. Output nothing except the tagged translations."#;

/// Renders the system prompt for a language pair
pub fn system_prompt(source_language: &str, target_language: &str) -> String {
    SYSTEM_PROMPT
        .replace("{source_language}", source_language)
        .replace("{target_language}", target_language)
}

/// Renders the index-tagged user message for a batch.
///
/// `hints` carries optional disambiguation context per entry (message
/// context, translator comments); it is listed ahead of the entries.
pub fn batch_prompt(texts: &[String], hints: &[Option<String>], source_language: &str, target_language: &str) -> String {
    let mut prompt = format!(
        "Translate the following {} entries from {} to {}.\n",
        texts.len(),
        source_language,
        target_language
    );

    let notes: Vec<String> = hints
        .iter()
        .enumerate()
        .filter_map(|(i, hint)| hint.as_deref().filter(|h| !h.trim().is_empty()).map(|h| format!("- ENTRY_{}: {}", i, h.trim())))
        .collect();
    if !notes.is_empty() {
        prompt.push_str("\nContext for some entries (do not translate):\n");
        prompt.push_str(&notes.join("\n"));
        prompt.push('\n');
    }

    prompt.push('\n');
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&entry_tag(i));
        prompt.push('\n');
        prompt.push_str(text);
        prompt.push('\n');
    }
    prompt.push_str(END_TAG);
    prompt
}

/// Parse a tagged answer into `expected` translations ordered by index
pub fn parse_batch_response(response: &str, expected: usize) -> Result<Vec<String>, ServiceError> {
    let end = response
        .rfind(END_TAG)
        .ok_or_else(|| ServiceError::Malformed(format!("Response has no {} tag", END_TAG)))?;
    let body = &response[..end];

    let tags: Vec<(usize, usize, usize)> = ENTRY_TAG_REGEX
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index = caps[1].parse().ok()?;
            Some((index, whole.start(), whole.end()))
        })
        .collect();

    let mut slots: Vec<Option<String>> = vec![None; expected];
    for (position, (index, _, content_start)) in tags.iter().enumerate() {
        let content_end = tags.get(position + 1).map_or(body.len(), |(_, start, _)| *start);
        let slot = slots.get_mut(*index).ok_or_else(|| {
            ServiceError::Malformed(format!("Unexpected entry index {} (batch has {})", index, expected))
        })?;
        if slot.is_some() {
            return Err(ServiceError::Malformed(format!("Entry {} appears more than once", index)));
        }
        *slot = Some(body[*content_start..content_end].trim().to_string());
    }

    let missing: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_none())
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        debug!("Tagged response lacks entries {:?}:\n{}", missing, response);
        return Err(ServiceError::Malformed(format!(
            "Response is missing entries {:?} ({} of {} returned)",
            missing,
            expected - missing.len(),
            expected
        )));
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_entries_and_hints() {
        let texts = vec!["Open".to_string(), "Close ⟦0⟧".to_string()];
        let prompt = batch_prompt(&texts, &[Some("menu".to_string()), None], "en", "de");
        assert!(prompt.contains("- ENTRY_0: menu"));
        assert!(prompt.contains("<<ENTRY_1>>\nClose ⟦0⟧\n<<END>>"));
        assert!(system_prompt("en", "de").contains("from en to de"));
    }

    #[test]
    fn parses_reordered_entries_by_index() {
        let response = "Sure!\n<<ENTRY_1>>\nSchließen\n<<ENTRY_0>>\nÖffnen\n<<END>>\n";
        let parsed = parse_batch_response(response, 2).unwrap();
        assert_eq!(parsed, vec!["Öffnen", "Schließen"]);
    }

    #[test]
    fn keeps_multiline_entries() {
        let response = "<<ENTRY_0>>\nZeile 1\nZeile 2\n<<END>>";
        assert_eq!(parse_batch_response(response, 1).unwrap(), vec!["Zeile 1\nZeile 2"]);
    }

    #[test]
    fn rejects_missing_end_tag() {
        let err = parse_batch_response("<<ENTRY_0>>\nÖffnen\n", 1).unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_duplicate_and_out_of_range_entries() {
        assert!(parse_batch_response("<<ENTRY_0>>\na\n<<END>>", 2).is_err());
        assert!(parse_batch_response("<<ENTRY_0>>\na\n<<ENTRY_0>>\nb\n<<END>>", 2).is_err());
        assert!(parse_batch_response("<<ENTRY_0>>\na\n<<ENTRY_5>>\nb\n<<END>>", 2).is_err());
    }
}
