/*!
 * Tests for batch building and batch dispatch integrity
 */

use anyhow::Result;

use po_translate::catalog::{Catalog, CatalogFormat};
use po_translate::providers::mock::MockProvider;
use po_translate::translation::{Batcher, Pipeline};
use crate::common;

#[test]
fn test_batcher_withKeyChanges_shouldNeverMixKeys() {
    let items = vec![("a", 1), ("a", 2), ("a", 3), ("b", 4), ("a", 5)];
    let batches: Vec<_> = Batcher::new(2).build(items, |(key, _)| *key).collect();

    let shapes: Vec<Vec<i32>> = batches.iter().map(|b| b.items.iter().map(|(_, v)| *v).collect()).collect();
    assert_eq!(shapes, vec![vec![1, 2], vec![3], vec![4], vec![5]]);
    assert_eq!(batches.iter().map(|b| b.number).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
}

#[test]
fn test_batcher_withZeroSize_shouldFallBackToOne() {
    let batcher = Batcher::new(0);
    assert_eq!(batcher.max_size(), 1);
    assert_eq!(batcher.build(0..3, |_| ()).count(), 3);
}

/// Every pending unit is sent exactly once, in catalog order, in batches no larger than the limit
#[tokio::test]
async fn test_dispatch_withManyUnits_shouldSendEachUnitOnceInOrder() -> Result<()> {
    let texts: Vec<String> = (1..=23).map(|i| format!("Message number {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let mut catalog = Catalog::parse(CatalogFormat::Po, common::po_with_entries(&refs).as_bytes())?;

    let provider = MockProvider::working();
    let mut options = common::test_options();
    options.batch_size = 5;
    let pipeline = Pipeline::new(&provider, options);

    let report = pipeline.translate_catalog(&mut catalog, |_, _| {}).await;

    let requests = provider.requests();
    assert_eq!(report.batches, 5);
    assert_eq!(requests.iter().map(|r| r.len()).collect::<Vec<_>>(), vec![5, 5, 5, 5, 3]);
    let sent: Vec<String> = requests.into_iter().flat_map(|r| r.texts).collect();
    assert_eq!(sent, texts);

    for (unit, text) in catalog.units.iter().zip(&texts) {
        assert_eq!(unit.target_text, format!("[sv] {}", text));
    }
    Ok(())
}

#[tokio::test]
async fn test_dispatch_withConcurrency_shouldMergeInBuildOrder() -> Result<()> {
    let texts: Vec<String> = (1..=12).map(|i| format!("Line {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let mut catalog = Catalog::parse(CatalogFormat::Po, common::po_with_entries(&refs).as_bytes())?;

    let provider = MockProvider::working().with_delay(std::time::Duration::from_millis(5));
    let mut options = common::test_options();
    options.batch_size = 2;
    options.concurrent_requests = 3;
    let pipeline = Pipeline::new(&provider, options);

    let progress = std::sync::Mutex::new(Vec::new());
    pipeline
        .translate_catalog(&mut catalog, |done, total| progress.lock().unwrap().push((done, total)))
        .await;

    assert_eq!(*progress.lock().unwrap(), (1..=6).map(|i| (i, 6)).collect::<Vec<_>>());
    for (unit, text) in catalog.units.iter().zip(&texts) {
        assert_eq!(unit.target_text, format!("[sv] {}", text));
    }
    Ok(())
}
