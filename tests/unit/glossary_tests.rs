/*!
 * Tests for glossary overrides inside the pipeline
 */

use anyhow::Result;

use po_translate::catalog::{Catalog, CatalogFormat};
use po_translate::providers::mock::MockProvider;
use po_translate::translation::{Glossary, Pipeline};
use crate::common;

fn swedish_words(text: &str, _target: &str) -> String {
    text.replace("Open", "Öppna")
        .replace("File", "Fil")
        .replace("Save", "Spara")
}

/// The glossary target term must win over whatever the backend produces
#[tokio::test]
async fn test_glossary_withConflictingBackendOutput_shouldForceTargetTerm() -> Result<()> {
    let po = common::po_with_entries(&["Open File", "Save", "Save the file"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::working().with_translator(swedish_words);
    let glossary = Glossary::parse("File,Arkiv", false)?;
    let pipeline = Pipeline::new(&provider, common::test_options()).with_glossary(Some(glossary));

    pipeline.translate_catalog(&mut catalog, |_, _| {}).await;

    assert_eq!(catalog.units[0].target_text, "Öppna Arkiv");
    assert_eq!(catalog.units[1].target_text, "Spara");
    // Case-insensitive glossary: "file" is the term too
    assert_eq!(catalog.units[2].target_text, "Spara the Arkiv");

    // The backend never saw the term itself
    let sent: Vec<String> = provider.requests().into_iter().flat_map(|r| r.texts).collect();
    assert!(sent.iter().all(|t| !t.to_lowercase().contains("file")), "{:?}", sent);
    Ok(())
}

#[tokio::test]
async fn test_glossary_withCaseSensitiveTerms_shouldLeaveOtherCasingAlone() -> Result<()> {
    let po = common::po_with_entries(&["Acme and ACME"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::working().with_translator(|text, _| text.replace("and", "och"));
    let glossary = Glossary::parse("Acme,Acme AB", true)?;
    let pipeline = Pipeline::new(&provider, common::test_options()).with_glossary(Some(glossary));

    pipeline.translate_catalog(&mut catalog, |_, _| {}).await;

    assert_eq!(catalog.units[0].target_text, "Acme AB och ACME");
    Ok(())
}

#[tokio::test]
async fn test_glossary_withTermOnlyUnit_shouldNotCallBackend() -> Result<()> {
    let po = common::po_with_entries(&["File"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::working();
    let glossary = Glossary::parse("File,Arkiv", false)?;
    let pipeline = Pipeline::new(&provider, common::test_options()).with_glossary(Some(glossary));

    let report = pipeline.translate_catalog(&mut catalog, |_, _| {}).await;

    assert_eq!(catalog.units[0].target_text, "Arkiv");
    assert_eq!(report.copied, 1);
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[test]
fn test_glossary_parse_withMalformedLine_shouldFail() {
    assert!(Glossary::parse("File Arkiv", false).is_err());
    assert!(Glossary::parse("File,", false).is_err());
}

/// A term that also occurs inside a placeholder only changes outside it
#[tokio::test]
async fn test_glossary_withTermInsidePlaceholder_shouldKeepPlaceholderIntact() -> Result<()> {
    let po = common::po_with_entries(&["Hello %(name)s, enter your name"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::working().with_translator(|text, _| text.replace("Hello", "Hej"));
    let glossary = Glossary::parse("name,namn", false)?;
    let pipeline = Pipeline::new(&provider, common::test_options()).with_glossary(Some(glossary));

    let report = pipeline.translate_catalog(&mut catalog, |_, _| {}).await;

    assert_eq!(catalog.units[0].target_text, "Hej %(name)s, enter your namn");
    assert!(report.warnings.is_empty());
    assert!(report.failures.is_empty());
    Ok(())
}
