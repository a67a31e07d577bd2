/*!
 * Tests for placeholder masking
 */

use po_translate::errors::PlaceholderMismatch;
use po_translate::translation::placeholders::{PlaceholderGuard, PlaceholderRule, is_placeholder_only, marker};

/// Source text carrying `n` distinct placeholders of mixed kinds
fn text_with_placeholders(n: usize) -> (String, Vec<&'static str>) {
    let kinds = ["{0}", "%s", "<b>", "%1$d", "&amp;"];
    let used: Vec<&str> = kinds.iter().copied().take(n).collect();
    let mut text = String::from("Start");
    for (i, placeholder) in used.iter().enumerate() {
        text.push_str(&format!(" word{} {}", i, placeholder));
    }
    text.push_str(" end");
    (text, used)
}

/// For N in {0, 1, 5}: masking leaves no raw placeholder and unmasking restores each exactly once
#[test]
fn test_mask_unmask_withZeroOneFivePlaceholders_shouldRestoreEachOnce() {
    let guard = PlaceholderGuard::default();
    for n in [0, 1, 5] {
        let (text, placeholders) = text_with_placeholders(n);
        let (masked, tokens) = guard.mask(&text);

        assert_eq!(tokens.len(), n, "{}", text);
        for placeholder in &placeholders {
            assert!(!masked.contains(placeholder), "{} still in {}", placeholder, masked);
        }

        // A backend that translates words and moves the first marker to the end
        let mut translated = masked.replace("Start", "Början").replace(" end", " slut");
        if n > 0 {
            translated = translated.replacen(&marker(0), "", 1) + " " + &marker(0);
        }
        let restored = guard.unmask(&translated, &tokens).unwrap();

        for placeholder in &placeholders {
            assert_eq!(restored.matches(placeholder).count(), 1, "{} in {}", placeholder, restored);
        }
        assert!(!restored.contains('⟦'));
    }
}

#[test]
fn test_unmask_withSpacesInsideMarkers_shouldStillMatch() {
    let guard = PlaceholderGuard::default();
    let (_, tokens) = guard.mask("Hello {name}");
    assert_eq!(guard.unmask("Hej ⟦ 0 ⟧", &tokens).unwrap(), "Hej {name}");
}

#[test]
fn test_unmask_withMissingOrDuplicatedMarker_shouldReportMismatch() {
    let guard = PlaceholderGuard::default();
    let (_, tokens) = guard.mask("%s of %d");

    assert_eq!(
        guard.unmask("⟦0⟧ av", &tokens).unwrap_err(),
        PlaceholderMismatch { expected: 2, found: 1 }
    );
    assert!(guard.unmask("⟦0⟧ av ⟦0⟧", &tokens).is_err());
    assert!(guard.unmask("⟦0⟧ av ⟦1⟧ ⟦2⟧", &tokens).is_err());
}

#[test]
fn test_mask_withLongestMatch_shouldPreferLongerRule() {
    let guard = PlaceholderGuard::default();
    let (masked, tokens) = guard.mask("%(count)d items, {{ user.name }} and %1$s");
    assert_eq!(masked, "⟦0⟧ items, ⟦1⟧ and ⟦2⟧");
    assert_eq!(tokens[0].text, "%(count)d");
    assert_eq!(tokens[1].text, "{{ user.name }}");
    assert_eq!(tokens[2].text, "%1$s");
}

#[test]
fn test_mask_withLiteralSentinels_shouldProtectThem() {
    let guard = PlaceholderGuard::default();
    let (masked, tokens) = guard.mask("Brackets ⟦ and ⟧");
    assert_eq!(tokens.len(), 2);
    assert_eq!(guard.unmask(&masked, &tokens).unwrap(), "Brackets ⟦ and ⟧");
}

#[test]
fn test_custom_rules_withOnlyDollarVariables_shouldIgnoreOtherSyntax() {
    let guard = PlaceholderGuard::new(&[PlaceholderRule::new("dollar", r"\$[a-z]+")]).unwrap();
    let (masked, tokens) = guard.mask("Hi $user, {0} left");
    assert_eq!(masked, "Hi ⟦0⟧, {0} left");
    assert_eq!(tokens.len(), 1);
    assert!(PlaceholderGuard::new(&[PlaceholderRule::new("broken", "(")]).is_err());
}

#[test]
fn test_is_placeholder_only_withMarkersAndWhitespace_shouldBeTrue() {
    assert!(is_placeholder_only("⟦0⟧ ⟦1⟧"));
    assert!(!is_placeholder_only("⟦0⟧ files"));
}
