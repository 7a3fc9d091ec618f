//! On-disk persistence of entity summaries.
//!
//! Each entity gets its own directory under the output root, named after
//! the sanitized entity name, holding a single `full_summary.json`.

use std::path::{Path, PathBuf};

use crate::ports::filesystem::FileSystem;
use crate::schema::EntitySummary;

/// File name used for every persisted summary.
pub const SUMMARY_FILE: &str = "full_summary.json";

/// Persists summaries under an output root via the filesystem port.
pub struct SummaryStore<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
}

/// Replaces path-separator characters so a name can serve as a directory.
fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

impl<'a> SummaryStore<'a> {
    /// Creates a store rooted at `root`.
    pub fn new(fs: &'a dyn FileSystem, root: impl Into<PathBuf>) -> Self {
        Self { fs, root: root.into() }
    }

    fn summary_path(&self, name: &str) -> PathBuf {
        self.root.join(sanitize(name)).join(SUMMARY_FILE)
    }

    /// Returns the output root this store writes under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes one entity summary as pretty-printed JSON, stamping the
    /// entity name into the document so [`SummaryStore::list`] can recover
    /// it from the sanitized directory later.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the underlying write fails.
    /// Persistence failures are fatal to the caller: a computed summary
    /// must never be silently lost.
    pub fn save(&self, name: &str, summary: &EntitySummary) -> Result<(), String> {
        let mut document = summary.clone();
        document.entity_name = Some(name.to_string());
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| format!("failed to serialize summary for {name}: {e}"))?;
        let path = self.summary_path(name);
        self.fs
            .write(&path, &json)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))
    }

    /// Loads one entity summary by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing or not a valid summary.
    pub fn load(&self, name: &str) -> Result<EntitySummary, String> {
        let path = self.summary_path(name);
        let json = self
            .fs
            .read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        serde_json::from_str(&json)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }

    /// Lists the names of all persisted entities, in sorted directory
    /// order.
    ///
    /// Names come from the entity name stamped into each document, falling
    /// back to the directory name for documents saved without one.
    /// Directories without a readable summary file are skipped. An absent
    /// root yields an empty list.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        if !self.fs.exists(&self.root) {
            return Vec::new();
        }
        let Ok(entries) = self.fs.list_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter_map(|entry| {
                let path = self.root.join(&entry).join(SUMMARY_FILE);
                let json = self.fs.read_to_string(&path).ok()?;
                let summary: EntitySummary = serde_json::from_str(&json).ok()?;
                Some(summary.entity_name.unwrap_or(entry))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory filesystem for store and pipeline tests.
    pub(crate) struct MemFs {
        pub files: Mutex<BTreeMap<PathBuf, String>>,
    }

    impl MemFs {
        pub(crate) fn new() -> Self {
            Self { files: Mutex::new(BTreeMap::new()) }
        }
    }

    impl FileSystem for MemFs {
        fn read_to_string(
            &self,
            path: &Path,
        ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| format!("no such file: {}", path.display()).into())
        }

        fn write(
            &self,
            path: &Path,
            contents: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            let files = self.files.lock().unwrap();
            files.keys().any(|p| p == path || p.starts_with(path))
        }

        fn list_dir(
            &self,
            path: &Path,
        ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
            let files = self.files.lock().unwrap();
            let mut entries: Vec<String> = files
                .keys()
                .filter_map(|p| p.strip_prefix(path).ok())
                .filter_map(|rest| rest.components().next())
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            entries.sort();
            entries.dedup();
            Ok(entries)
        }
    }

    fn sample_summary() -> EntitySummary {
        EntitySummary {
            module: "auth".into(),
            description: "authentication".into(),
            dependencies: vec!["UserRepository".into()],
            ..EntitySummary::default()
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");

        store.save("AuthService", &sample_summary()).unwrap();
        let loaded = store.load("AuthService").unwrap();
        let expected = EntitySummary {
            entity_name: Some("AuthService".into()),
            ..sample_summary()
        };
        assert_eq!(loaded, expected);
    }

    #[test]
    fn path_like_names_are_sanitized() {
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");

        store.save("auth/login", &sample_summary()).unwrap();
        let files = fs.files.lock().unwrap();
        assert!(files.contains_key(Path::new("/out/auth_login/full_summary.json")));
    }

    #[test]
    fn list_recovers_original_path_like_names() {
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");

        store.save("auth/login", &sample_summary()).unwrap();
        assert_eq!(store.list(), vec!["auth/login"]);
        assert_eq!(store.load("auth/login").unwrap().module, "auth");
    }

    #[test]
    fn list_returns_sorted_names_with_summaries() {
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        store.save("Zeta", &sample_summary()).unwrap();
        store.save("Alpha", &sample_summary()).unwrap();
        fs.write(Path::new("/out/NotASummary/readme.txt"), "x").unwrap();

        assert_eq!(store.list(), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn missing_root_lists_nothing() {
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        assert!(store.list().is_empty());
    }

    #[test]
    fn loading_a_missing_summary_is_an_error() {
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        assert!(store.load("Ghost").is_err());
    }
}
