/*!
 * Tests for the catalog format adapters
 */

use anyhow::Result;
use std::fs;

use po_translate::catalog::{Catalog, CatalogFormat};
use crate::common;

fn load(name: &str) -> Result<(Vec<u8>, Catalog)> {
    let path = common::test_resource_path(name);
    let bytes = fs::read(&path)?;
    let format = CatalogFormat::from_path(&path).ok_or_else(|| anyhow::anyhow!("unknown format"))?;
    let catalog = Catalog::parse(format, &bytes)?;
    Ok((bytes, catalog))
}

/// Parsing and serializing an untouched catalog must reproduce the file exactly
#[test]
fn test_round_trip_withUntouchedCatalogs_shouldBeByteIdentical() -> Result<()> {
    for name in ["sample.po", "sample.ts", "sample.xlf"] {
        let (bytes, catalog) = load(name)?;
        assert!(!catalog.is_modified(), "{}", name);
        assert_eq!(catalog.serialize()?, bytes, "{} did not round-trip", name);
    }
    Ok(())
}

#[test]
fn test_round_trip_withByteOrderMark_shouldKeepIt() -> Result<()> {
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(common::po_with_entries(&["Save"]).as_bytes());
    let catalog = Catalog::parse(CatalogFormat::Po, &bytes)?;
    assert_eq!(catalog.serialize()?, bytes);
    Ok(())
}

#[test]
fn test_po_parse_withSample_shouldExposeUnitsAndHeader() -> Result<()> {
    let (_, catalog) = load("sample.po")?;

    assert_eq!(catalog.metadata_value("Language"), Some("sv"));
    let sources: Vec<&str> = catalog.units.iter().map(|u| u.source_text.as_str()).collect();
    assert_eq!(
        sources,
        vec![
            "Hello {0}",
            "Saved %d of %s",
            "Open",
            "Click <b>here</b> to open the file.",
            "%d file",
            "%d files",
        ]
    );

    let hello = &catalog.units[0];
    assert!(hello.fuzzy);
    assert_eq!(hello.target_text, "Hallå {0}");
    assert_eq!(catalog.units[2].context.as_deref(), Some("toolbar"));
    assert_eq!(catalog.units[5].plural_index, Some(1));
    Ok(())
}

#[test]
fn test_po_serialize_withTranslatedUnit_shouldOnlyTouchThatEntry() -> Result<()> {
    let (bytes, mut catalog) = load("sample.po")?;
    catalog.units[1].set_translation("Sparade %d av %s");

    let out = String::from_utf8(catalog.serialize()?)?;
    let original = String::from_utf8(bytes)?;
    assert!(out.contains("msgid \"Saved %d of %s\"\nmsgstr \"Sparade %d av %s\"\n"));
    assert_eq!(
        out.replace("msgstr \"Sparade %d av %s\"", "msgstr \"\""),
        original,
        "everything but the translated entry must be preserved"
    );
    Ok(())
}

#[test]
fn test_ts_parse_withSample_shouldExpandNumerusForms() -> Result<()> {
    let (_, catalog) = load("sample.ts")?;

    assert_eq!(catalog.units.len(), 5);
    assert_eq!(catalog.units[1].source_text, "&Quit");
    assert_eq!(catalog.units[1].target_text, "&Avsluta");
    assert_eq!(catalog.units[2].plural_index, Some(0));
    assert_eq!(catalog.units[3].plural_index, Some(1));
    assert_eq!(catalog.units[4].source_text, "Use <b>dark</b> theme");
    assert_eq!(catalog.units[4].context.as_deref(), Some("SettingsDialog"));
    Ok(())
}

#[test]
fn test_ts_serialize_withTranslation_shouldEscapeMarkup() -> Result<()> {
    let (_, mut catalog) = load("sample.ts")?;
    catalog.units[4].set_translation("Använd <b>mörkt</b> tema");

    let out = String::from_utf8(catalog.serialize()?)?;
    assert!(out.contains("<translation>Använd &lt;b&gt;mörkt&lt;/b&gt; tema</translation>"));
    Ok(())
}

#[test]
fn test_xliff_parse_withSample_shouldSkipUntranslatableUnits() -> Result<()> {
    let (_, catalog) = load("sample.xlf")?;

    assert_eq!(catalog.units.len(), 3);
    assert_eq!(catalog.target_language.as_deref(), Some("sv"));
    assert_eq!(catalog.units[1].source_text, r#"Press <g id="1">Save</g> to keep your changes"#);
    assert_eq!(catalog.units[2].target_text, "Avbryt");
    assert!(!catalog.units[2].fuzzy);
    Ok(())
}

#[test]
fn test_parse_withInvalidInput_shouldReportParseError() {
    let err = Catalog::parse(CatalogFormat::Po, b"msgid \"unterminated\nmsgstr \"\"\n").unwrap_err();
    assert_eq!(err.format, "PO");

    assert!(Catalog::parse(CatalogFormat::Po, b"msgid \"\xff\"\nmsgstr \"\"\n").is_err());
    assert!(Catalog::parse(CatalogFormat::Xliff, b"<xliff version=\"1.2\"><file>").is_err());
}
