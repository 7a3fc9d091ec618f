//! Disk-backed filesystem adapter.
//!
//! Reads the markdown document corpus and writes per-entity summary
//! directories and the run report under the output root.

use std::path::Path;

use crate::ports::filesystem::FileSystem;

/// Filesystem adapter over `std::fs`.
///
/// `write` creates missing parent directories, so a per-entity output
/// directory appears the first time its summary is saved.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let mut entries: Vec<String> = std::fs::read_dir(path)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .collect();
        // Sorted so corpus files concatenate in a stable order.
        entries.sort();
        Ok(entries)
    }
}
