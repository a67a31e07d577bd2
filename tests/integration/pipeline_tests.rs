/*!
 * Integration tests for the translation pipeline over parsed catalogs
 */

use anyhow::Result;
use std::fs;

use po_translate::app_controller::render_diff;
use po_translate::catalog::{Catalog, CatalogFormat};
use po_translate::errors::ServiceErrorKind;
use po_translate::providers::Capability;
use po_translate::providers::mock::MockProvider;
use po_translate::translation::Pipeline;
use po_translate::translation::pipeline::{FailureReason, FileStatus};
use crate::common;

fn to_swedish(text: &str, _target: &str) -> String {
    text.replace("Hello", "Hej")
        .replace("Saved", "Sparade")
        .replace(" of ", " av ")
        .replace("Click", "Klicka")
        .replace("here", "här")
        .replace("to open the file.", "för att öppna den.")
        .replace("files", "filer")
        .replace("file", "fil")
        .replace("selected", "valda")
        .replace("Press", "Tryck på")
        .replace("Save", "Spara")
}

/// The `Hello {0}` scenario: a fuzzy PO entry comes back as `Hej {0}` with the fuzzy flag cleared
#[tokio::test]
async fn test_po_hello_withFuzzyEntry_shouldTranslateAndClearFuzzy() -> Result<()> {
    let bytes = fs::read(common::test_resource_path("sample.po"))?;
    let mut catalog = Catalog::parse(CatalogFormat::Po, &bytes)?;
    let provider = MockProvider::working().with_translator(to_swedish);
    let pipeline = Pipeline::new(&provider, common::test_options());

    let report = pipeline.translate_catalog(&mut catalog, |_, _| {}).await;

    assert_eq!(report.selected, 5);
    assert_eq!(report.translated, 5);
    assert!(report.failures.is_empty());

    let hello = &catalog.units[0];
    assert_eq!(hello.target_text, "Hej {0}");
    assert!(!hello.fuzzy);

    let out = String::from_utf8(catalog.serialize()?)?;
    assert!(out.contains("#: src/app.c:12\nmsgid \"Hello {0}\"\nmsgstr \"Hej {0}\"\n"), "{}", out);
    assert!(!out.contains("#, fuzzy"));
    assert!(out.contains("msgstr \"Sparade %d av %s\""));
    assert!(out.contains("msgstr[0] \"%d fil\"\nmsgstr[1] \"%d filer\""));
    // Untouched entries keep their bytes
    assert!(out.contains("#. Button label\nmsgctxt \"toolbar\"\nmsgid \"Open\"\nmsgstr \"Öppna\"\n"));
    assert!(out.contains("#~ msgid \"Obsolete\"\n#~ msgstr \"Föråldrad\""));
    Ok(())
}

/// Placeholders and markup survive a full pipeline run in every format
#[tokio::test]
async fn test_pipeline_withMarkupInEveryFormat_shouldKeepPlaceholdersIntact() -> Result<()> {
    let provider = MockProvider::working().with_translator(to_swedish);

    let bytes = fs::read(common::test_resource_path("sample.ts"))?;
    let mut ts = Catalog::parse(CatalogFormat::Ts, &bytes)?;
    Pipeline::new(&provider, common::test_options())
        .translate_catalog(&mut ts, |_, _| {})
        .await;
    assert_eq!(ts.units[0].target_text, "Hej %1");
    assert_eq!(ts.units[2].target_text, "%n fil(s) valda");
    assert_eq!(ts.units[4].target_text, "Use <b>dark</b> theme");

    let bytes = fs::read(common::test_resource_path("sample.xlf"))?;
    let mut xliff = Catalog::parse(CatalogFormat::Xliff, &bytes)?;
    Pipeline::new(&provider, common::test_options())
        .translate_catalog(&mut xliff, |_, _| {})
        .await;
    assert_eq!(xliff.units[0].target_text, "Hej, {name}!");
    assert_eq!(xliff.units[1].target_text, r#"Tryck på <g id="1">Spara</g> to keep your changes"#);

    let out = String::from_utf8(xliff.serialize()?)?;
    assert!(out.contains(r#"<target state="translated">Tryck på <g id="1">Spara</g> to keep your changes</target>"#));
    Ok(())
}

/// A second run over the result must not call the backend or change anything
#[tokio::test]
async fn test_pipeline_withSecondRun_shouldBeIdempotent() -> Result<()> {
    let bytes = fs::read(common::test_resource_path("sample.po"))?;
    let provider = MockProvider::working().with_translator(to_swedish);

    let mut first = Catalog::parse(CatalogFormat::Po, &bytes)?;
    Pipeline::new(&provider, common::test_options())
        .translate_catalog(&mut first, |_, _| {})
        .await;
    let once = first.serialize()?;
    let calls = provider.request_count();

    let mut second = Catalog::parse(CatalogFormat::Po, &once)?;
    let report = Pipeline::new(&provider, common::test_options())
        .translate_catalog(&mut second, |_, _| {})
        .await;

    assert_eq!(report.status, FileStatus::Unchanged);
    assert_eq!(report.selected, 0);
    assert_eq!(provider.request_count(), calls);
    assert_eq!(second.serialize()?, once);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withSkipFuzzy_shouldLeaveFuzzyEntries() -> Result<()> {
    let bytes = fs::read(common::test_resource_path("sample.po"))?;
    let mut catalog = Catalog::parse(CatalogFormat::Po, &bytes)?;
    let provider = MockProvider::working();
    let mut options = common::test_options();
    options.skip_fuzzy = true;

    let report = Pipeline::new(&provider, options)
        .translate_catalog(&mut catalog, |_, _| {})
        .await;

    assert_eq!(report.selected, 4);
    assert_eq!(catalog.units[0].target_text, "Hallå {0}");
    assert!(catalog.units[0].fuzzy);
    Ok(())
}

/// Batch 2 of 3 keeps failing with rate limits: batches 1 and 3 are merged, batch 2 is reported
#[tokio::test]
async fn test_pipeline_withMiddleBatchRateLimited_shouldIsolateFailure() -> Result<()> {
    let po = common::po_with_entries(&["one", "two", "three", "four", "five", "six"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::working().with_fail_when(
        |request| request.texts.iter().any(|t| t == "three"),
        ServiceErrorKind::RateLimited,
    );
    let mut options = common::test_options();
    options.batch_size = 2;
    options.retry_count = 2;

    let report = Pipeline::new(&provider, options)
        .translate_catalog(&mut catalog, |_, _| {})
        .await;

    // 1 + (1 + 2 retries) + 1
    assert_eq!(provider.request_count(), 5);
    let targets: Vec<&str> = catalog.units.iter().map(|u| u.target_text.as_str()).collect();
    assert_eq!(targets, vec!["[sv] one", "[sv] two", "", "", "[sv] five", "[sv] six"]);

    assert_eq!(report.failed_units(), 2);
    let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![2, 3]);
    assert!(matches!(
        report.failures[0].reason,
        FailureReason::Service { kind: ServiceErrorKind::RateLimited, .. }
    ));
    assert_eq!(report.status, FileStatus::Written);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_withEmptyTranslation_shouldReportUnit() -> Result<()> {
    let po = common::po_with_entries(&["Keep", "Drop"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::working().with_translator(|text, _| if text == "Drop" { "  ".to_string() } else { text.to_string() });

    let report = Pipeline::new(&provider, common::test_options())
        .translate_catalog(&mut catalog, |_, _| {})
        .await;

    assert_eq!(catalog.units[0].target_text, "Keep");
    assert_eq!(catalog.units[1].target_text, "");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].reason, FailureReason::EmptyTranslation);
    Ok(())
}

/// Context-aware backends get context and comments as hints; others get none
#[tokio::test]
async fn test_pipeline_withAiBackend_shouldSendHintsAndStripQuotes() -> Result<()> {
    let bytes = fs::read(common::test_resource_path("sample.ts"))?;

    let ai = MockProvider::working()
        .with_capability(Capability::AiContextAware)
        .with_translator(|text, _| format!("\"{}\"", text.replace("Hello", "Hej")));
    let mut catalog = Catalog::parse(CatalogFormat::Ts, &bytes)?;
    Pipeline::new(&ai, common::test_options())
        .translate_catalog(&mut catalog, |_, _| {})
        .await;

    let request = &ai.requests()[0];
    assert_eq!(request.hints[0].as_deref(), Some("MainWindow; Greeting in the status bar"));
    assert_eq!(catalog.units[0].target_text, "Hej %1");

    let free = MockProvider::working();
    let mut catalog = Catalog::parse(CatalogFormat::Ts, &bytes)?;
    Pipeline::new(&free, common::test_options())
        .translate_catalog(&mut catalog, |_, _| {})
        .await;
    assert!(free.requests()[0].hints.is_empty());
    Ok(())
}

/// A dry run against a rejecting backend still lists the untranslated unit
#[tokio::test]
async fn test_pipeline_withDryRunAndFailingBackend_shouldReportFailureInDiff() -> Result<()> {
    let po = common::po_with_entries(&["Open"]);
    let mut catalog = Catalog::parse(CatalogFormat::Po, po.as_bytes())?;
    let provider = MockProvider::failing(ServiceErrorKind::AuthFailed);
    let mut options = common::test_options();
    options.dry_run = true;

    let report = Pipeline::new(&provider, options)
        .translate_catalog(&mut catalog, |_, _| {})
        .await;

    assert_eq!(report.status, FileStatus::DryRun);
    assert_eq!(report.failed_units(), 1);
    assert_eq!(report.diffs.len(), 1);
    assert_eq!(report.diffs[0].source_text, "Open");
    assert!(matches!(
        report.diffs[0].failure,
        Some(FailureReason::Service { kind: ServiceErrorKind::AuthFailed, .. })
    ));
    assert!(render_diff(&report).contains("! \"Open\" (failed: auth-failed"));
    Ok(())
}
