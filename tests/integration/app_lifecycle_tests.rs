/*!
 * Full application lifecycle tests: controller runs over catalog files on disk
 */

use anyhow::Result;
use std::fs;

use po_translate::app_controller::Controller;
use po_translate::errors::ServiceErrorKind;
use po_translate::providers::mock::MockProvider;
use crate::common;

fn controller(configure: impl FnOnce(&mut po_translate::Config)) -> Result<Controller> {
    common::init_logging();
    let mut config = common::test_config();
    configure(&mut config);
    Ok(Controller::with_config(config)?.with_progress(false))
}

#[tokio::test]
async fn test_run_withDirectoryOfCatalogs_shouldWriteEveryFormat() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let po = common::copy_resource(temp_dir.path(), "sample.po")?;
    let ts = common::copy_resource(temp_dir.path(), "sample.ts")?;
    let xlf = common::copy_resource(temp_dir.path(), "sample.xlf")?;
    let provider = MockProvider::working();

    let summary = controller(|_| {})?
        .run_with_provider(&provider, &[temp_dir.path().to_path_buf()])
        .await?;

    assert_eq!(summary.files, 3);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.exit_code(), 0);
    assert!(fs::read_to_string(&po)?.contains("msgstr \"[sv] Hello {0}\""));
    assert!(fs::read_to_string(&ts)?.contains("<translation>[sv] Hello %1</translation>"));
    assert!(fs::read_to_string(&xlf)?.contains("[sv] Hello, {name}!"));
    Ok(())
}

#[tokio::test]
async fn test_run_withRateLimitedBatch_shouldWriteOthersAndFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "sv.po", &common::po_with_entries(&["Alpha", "Beta", "Gamma"]))?;
    let provider = MockProvider::working()
        .with_fail_when(|request| request.texts.iter().any(|t| t == "Beta"), ServiceErrorKind::RateLimited);

    let summary = controller(|config| {
        config.run.batch_size = 1;
        config.translation.common.retry_count = 1;
    })?
    .run_with_provider(&provider, &[path.clone()])
    .await?;

    let content = fs::read_to_string(&path)?;
    assert!(content.contains("msgid \"Alpha\"\nmsgstr \"[sv] Alpha\""));
    assert!(content.contains("msgid \"Beta\"\nmsgstr \"\""));
    assert!(content.contains("msgid \"Gamma\"\nmsgstr \"[sv] Gamma\""));
    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed_units, 1);
    assert_eq!(summary.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_withDryRun_shouldNotTouchFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::copy_resource(temp_dir.path(), "sample.po")?;
    let before = fs::read(&path)?;
    let provider = MockProvider::working();

    let summary = controller(|config| config.run.dry_run = true)?
        .run_with_provider(&provider, &[path.clone()])
        .await?;

    assert_eq!(summary.dry_run, 1);
    assert_eq!(summary.written, 0);
    assert_eq!(fs::read(&path)?, before);
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_withBrokenCatalog_shouldIsolateFileFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let broken = common::create_test_file(temp_dir.path(), "a.po", "msgid \"oops\nmsgstr \"\"\n")?;
    let good = common::create_test_file(temp_dir.path(), "b.po", &common::po_with_entries(&["Fine"]))?;
    let provider = MockProvider::working();

    let summary = controller(|_| {})?
        .run_with_provider(&provider, &[temp_dir.path().to_path_buf()])
        .await?;

    assert_eq!(summary.failed_files, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(fs::read_to_string(&broken)?, "msgid \"oops\nmsgstr \"\"\n");
    assert!(fs::read_to_string(&good)?.contains("msgstr \"[sv] Fine\""));
    assert_ne!(summary.exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withCancelledRun_shouldLeaveFileUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "sv.po", &common::po_with_entries(&["One", "Two"]))?;
    let before = fs::read(&path)?;
    let provider = MockProvider::working();

    let controller = controller(|config| config.run.batch_size = 1)?;
    controller.cancel_flag().store(true, std::sync::atomic::Ordering::SeqCst);
    let summary = controller.run_with_provider(&provider, &[path.clone()]).await?;

    assert_eq!(provider.request_count(), 0);
    assert_eq!(fs::read(&path)?, before);
    assert_eq!(summary.files, 0);
    assert_eq!(summary.unprocessed, 1);
    assert_eq!(summary.exit_code(), 130);
    Ok(())
}

#[tokio::test]
async fn test_run_withSecondRun_shouldLeaveFilesUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::copy_resource(temp_dir.path(), "sample.xlf")?;
    let provider = MockProvider::working();
    let controller = controller(|_| {})?;

    controller.run_with_provider(&provider, &[path.clone()]).await?;
    let once = fs::read(&path)?;
    let calls = provider.request_count();

    let summary = controller.run_with_provider(&provider, &[path.clone()]).await?;

    assert_eq!(summary.unchanged, 1);
    assert_eq!(provider.request_count(), calls);
    assert_eq!(fs::read(&path)?, once);
    Ok(())
}

#[tokio::test]
async fn test_run_withGlossaryFile_shouldApplyTerms() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let glossary = common::create_test_file(temp_dir.path(), "terms.csv", "# product terms\nWidget,Manick\n")?;
    let path = common::create_test_file(temp_dir.path(), "sv.po", &common::po_with_entries(&["Add a widget"]))?;
    let provider = MockProvider::working().with_translator(|text, _| text.replace("Add a", "Lägg till en"));

    controller(|config| config.run.glossary = Some(glossary.clone()))?
        .run_with_provider(&provider, &[path.clone()])
        .await?;

    assert!(fs::read_to_string(&path)?.contains("msgstr \"Lägg till en Manick\""));
    Ok(())
}
