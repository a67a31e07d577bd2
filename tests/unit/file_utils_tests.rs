/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;

use po_translate::file_utils::FileManager;
use crate::common;

#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.po", "")?;
    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.po")));
    Ok(())
}

#[test]
fn test_find_catalog_files_withMixedTree_shouldReturnSortedCatalogs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "po/sv.po", "")?;
    common::create_test_file(root, "po/de.po", "")?;
    common::create_test_file(root, "po/app.pot", "")?;
    common::create_test_file(root, "qt/app_sv.ts", "")?;
    common::create_test_file(root, "web/messages.xliff", "")?;
    common::create_test_file(root, "web/notes.md", "")?;

    let found = FileManager::find_catalog_files(&[root], true)?;
    let names: Vec<String> = found
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["po/de.po", "po/sv.po", "qt/app_sv.ts", "web/messages.xliff"]);

    assert!(FileManager::find_catalog_files(&[root], false)?.is_empty());
    Ok(())
}

#[test]
fn test_write_atomic_withExistingFile_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "sv.po", "old")?;

    FileManager::write_atomic(&path, "new".as_bytes())?;

    assert_eq!(fs::read_to_string(&path)?, "new");
    let leftovers = fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".po-translate-"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}
