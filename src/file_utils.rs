use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::CatalogFormat;
use crate::errors::WriteError;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    /// Whether a path names a catalog this tool can translate
    pub fn is_catalog(path: &Path) -> bool {
        CatalogFormat::from_path(path).is_some()
    }

    /// Expand input paths into a sorted, de-duplicated list of catalog files.
    ///
    /// Files are taken as given when their extension is supported; directories
    /// are scanned (recursively unless `recursive` is false). Templates
    /// (`.pot`) and unknown extensions are ignored.
    pub fn find_catalog_files<P: AsRef<Path>>(paths: &[P], recursive: bool) -> Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();

        for path in paths {
            let path = path.as_ref();
            if Self::file_exists(path) {
                if Self::is_catalog(path) {
                    found.insert(path.to_path_buf());
                } else {
                    warn!("Skipping {:?}: not a .po, .ts, .xlf or .xliff file", path);
                }
            } else if Self::dir_exists(path) {
                let walker = WalkDir::new(path).follow_links(true).max_depth(if recursive { usize::MAX } else { 1 });
                for entry in walker {
                    let entry = entry.with_context(|| format!("Failed to read directory entry in {:?}", path))?;
                    if entry.file_type().is_file() && Self::is_catalog(entry.path()) {
                        found.insert(entry.path().to_path_buf());
                    }
                }
            } else {
                return Err(anyhow!("Input path does not exist: {:?}", path));
            }
        }

        debug!("Found {} catalog file(s)", found.len());
        Ok(found.into_iter().collect())
    }

    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    /// Replace `path` with `content` atomically.
    ///
    /// The bytes go to a temporary file in the same directory, which takes
    /// over the original's permissions and is renamed into place. On any
    /// failure the temporary file is removed and the original is untouched.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<(), WriteError> {
        let path = path.as_ref();
        let failed = |message: String| WriteError {
            path: path.to_path_buf(),
            message,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".po-translate-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| failed(format!("cannot create temporary file in {:?}: {}", dir, e)))?;

        temp.write_all(content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| failed(format!("cannot write temporary file: {}", e)))?;

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(temp.path(), metadata.permissions())
                .map_err(|e| failed(format!("cannot copy permissions: {}", e)))?;
        }

        temp.persist(path)
            .map_err(|e| failed(format!("cannot replace file: {}", e.error)))?;
        Ok(())
    }
}
