// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The manifest store (§4.3): reads and writes generation documents for one
//! sealed root, lists prior generations, and locates nested sealed roots.
//!
//! Generation files live in a sibling `ascmhl/` directory and are named
//! `NNNN_<rootname>_YYYY-MM-DD_HHMMSS.ascmhl.json`, where `NNNN` is the
//! zero-padded generation number. Atomic append follows the teacher's
//! `record/store.rs::write_runs_json` shape: write via `atomicwrites`, which
//! writes to a temp name in the same directory and renames over the target.

mod lock;

pub use lock::ManifestStoreLock;

use crate::errors::StoreError;
use ascmhl_metadata::GenerationDocument;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::io::Write;

/// The name of the directory, relative to a sealed root, holding its generations.
pub const STORE_DIR_NAME: &str = "ascmhl";

/// A manifest store bound to one sealed root.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: Utf8PathBuf,
    store_dir: Utf8PathBuf,
}

impl ManifestStore {
    /// Binds a manifest store to `root`, without touching the filesystem.
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            store_dir: root.join(STORE_DIR_NAME),
        }
    }

    /// The sealed root this store belongs to.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The `ascmhl/` directory holding generation files.
    pub fn store_dir(&self) -> &Utf8Path {
        &self.store_dir
    }

    /// Returns true iff `path` directly contains an `ascmhl/` subdirectory
    /// with at least one generation file (§6: nested-root discovery rule).
    pub fn is_sealed_root(path: &Utf8Path) -> bool {
        let store_dir = path.join(STORE_DIR_NAME);
        let Ok(entries) = std::fs::read_dir(&store_dir) else {
            return false;
        };
        entries.filter_map(Result::ok).any(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| parse_generation_number(name).is_some())
        })
    }

    /// Creates the `ascmhl/` directory if it doesn't already exist.
    pub fn ensure_store_dir(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.store_dir).map_err(|source| StoreError::DirCreate {
            path: self.store_dir.clone(),
            source,
        })
    }

    /// Lists every generation number recorded in this store, in order.
    ///
    /// Fails with [`StoreError::CorruptHistory`] if the numbers are not a
    /// contiguous `1..N` sequence (Invariant 1).
    pub fn list_generations(&self) -> Result<Vec<u32>, StoreError> {
        let entries = match std::fs::read_dir(&self.store_dir) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::GenerationRead {
                    path: self.store_dir.clone(),
                    source,
                });
            }
        };

        let mut numbers: Vec<u32> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(parse_generation_number)
            })
            .collect();
        numbers.sort_unstable();

        for (index, &number) in numbers.iter().enumerate() {
            let expected = index as u32 + 1;
            if number != expected {
                return Err(StoreError::CorruptHistory {
                    path: self.store_dir.clone(),
                    reason: format!(
                        "generation numbers are not contiguous: expected {expected}, found {number}"
                    ),
                });
            }
        }

        Ok(numbers)
    }

    /// Loads generation `number`'s document.
    pub fn load(&self, number: u32) -> Result<GenerationDocument, StoreError> {
        let path = self.generation_path_glob(number)?;
        let contents = std::fs::read_to_string(&path).map_err(|source| StoreError::GenerationRead {
            path: path.clone(),
            source,
        })?;
        let document: GenerationDocument = serde_json::from_str(&contents)
            .map_err(|source| StoreError::GenerationParse { path, source })?;

        if document.generation_number != number {
            return Err(StoreError::CorruptHistory {
                path: self.store_dir.clone(),
                reason: format!(
                    "generation file for {number} declares generation_number {}",
                    document.generation_number
                ),
            });
        }
        Ok(document)
    }

    /// Loads every generation in order, validating the previous-reference
    /// chain (Invariant 3) as it goes.
    pub fn load_all(&self) -> Result<Vec<GenerationDocument>, StoreError> {
        let numbers = self.list_generations()?;
        let mut documents = Vec::with_capacity(numbers.len());
        let mut previous: Option<u32> = None;
        for number in numbers {
            let document = self.load(number)?;
            if document.previous_generation != previous {
                return Err(StoreError::CorruptHistory {
                    path: self.store_dir.clone(),
                    reason: format!(
                        "generation {number} references previous generation {:?}, expected {:?}",
                        document.previous_generation, previous
                    ),
                });
            }
            previous = Some(number);
            documents.push(document);
        }
        Ok(documents)
    }

    /// Appends `document` as the next generation, atomically. Returns the
    /// path of the file written, relative to `root`.
    pub fn append(&self, document: &GenerationDocument) -> Result<Utf8PathBuf, StoreError> {
        self.ensure_store_dir()?;
        let path = self.generation_path_for(document.generation_number, &document.root_name);
        let json = serde_json::to_string_pretty(document).map_err(|source| {
            StoreError::GenerationParse {
                path: path.clone(),
                source,
            }
        })?;

        atomicwrites::AtomicFile::new(&path, atomicwrites::DisallowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| StoreError::GenerationWrite {
                path: path.clone(),
                source: match error {
                    atomicwrites::Error::Internal(source) => source,
                    atomicwrites::Error::User(source) => source,
                },
            })?;

        Ok(path
            .strip_prefix(&self.root)
            .unwrap_or(&path)
            .to_owned())
    }

    /// Acquires an advisory lock on this store for the duration of a seal
    /// (§5). Absence of contention is the common case; the lock only
    /// prevents two concurrent seals of the same root.
    pub fn lock(&self) -> Result<ManifestStoreLock<'_>, StoreError> {
        self.ensure_store_dir()?;
        ManifestStoreLock::acquire(&self.store_dir)
    }

    /// Finds sealed-root markers strictly beneath `under`, not descending
    /// past a sealed root's own boundary once found (§4.3, §6).
    pub fn locate_nested_roots(under: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StoreError> {
        let mut found = Vec::new();
        locate_nested_roots_inner(under, &mut found)?;
        Ok(found)
    }

    fn generation_path_for(&self, number: u32, root_name: &str) -> Utf8PathBuf {
        let timestamp = Utc::now().format("%Y-%m-%d_%H%M%S");
        self.store_dir
            .join(format!("{number:04}_{root_name}_{timestamp}.ascmhl.json"))
    }

    /// Resolves the on-disk path for an already-written generation, by
    /// scanning for the `NNNN_` prefix rather than reconstructing the
    /// timestamp suffix.
    fn generation_path_glob(&self, number: u32) -> Result<Utf8PathBuf, StoreError> {
        let prefix = format!("{number:04}_");
        let entries = std::fs::read_dir(&self.store_dir).map_err(|source| StoreError::GenerationRead {
            path: self.store_dir.clone(),
            source,
        })?;
        for entry in entries.filter_map(Result::ok) {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) && name.ends_with(".ascmhl.json") {
                    return Utf8PathBuf::from_path_buf(entry.path())
                        .map_err(|path| StoreError::CorruptHistory {
                            path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
                            reason: "generation file name is not valid UTF-8".to_string(),
                        });
                }
            }
        }
        Err(StoreError::CorruptHistory {
            path: self.store_dir.clone(),
            reason: format!("no generation file found for generation {number}"),
        })
    }
}

fn locate_nested_roots_inner(
    under: &Utf8Path,
    found: &mut Vec<Utf8PathBuf>,
) -> Result<(), StoreError> {
    let entries = match std::fs::read_dir(under) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(StoreError::GenerationRead {
                path: under.to_owned(),
                source,
            });
        }
    };

    for entry in entries.filter_map(Result::ok) {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        if path.file_name() == Some(STORE_DIR_NAME) {
            continue;
        }
        if ManifestStore::is_sealed_root(&path) {
            found.push(path);
        } else {
            locate_nested_roots_inner(&path, found)?;
        }
    }
    Ok(())
}

/// Parses the `NNNN` prefix out of a generation file name, validating the
/// `.ascmhl.json` suffix.
fn parse_generation_number(file_name: &str) -> Option<u32> {
    let suffix = ".ascmhl.json";
    if !file_name.ends_with(suffix) {
        return None;
    }
    let prefix = file_name.split('_').next()?;
    if prefix.len() != 4 {
        return None;
    }
    prefix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascmhl_metadata::GenerationDocument;
    use camino_tempfile::tempdir;

    fn sample_document(generation_number: u32, previous_generation: Option<u32>) -> GenerationDocument {
        GenerationDocument {
            generation_number,
            previous_generation,
            created_at: Utc::now(),
            creator_host: "host".to_string(),
            creator_user: "user".to_string(),
            root_name: "R".to_string(),
            files: Vec::new(),
            directories: Vec::new(),
            missing: Vec::new(),
            child_histories: Vec::new(),
        }
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let doc = sample_document(1, None);
        store.append(&doc).unwrap();

        assert_eq!(store.list_generations().unwrap(), vec![1]);
        let loaded = store.load(1).unwrap();
        assert_eq!(loaded.generation_number, 1);
        assert_eq!(loaded.root_name, "R");
    }

    #[test]
    fn detects_non_contiguous_generations() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store.append(&sample_document(1, None)).unwrap();
        store.append(&sample_document(3, Some(1))).unwrap();

        assert!(store.list_generations().is_err());
    }

    #[test]
    fn detects_previous_reference_mismatch() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        store.append(&sample_document(1, None)).unwrap();
        store.append(&sample_document(2, Some(99))).unwrap();

        assert!(store.load_all().is_err());
    }

    #[test]
    fn is_sealed_root_requires_at_least_one_generation() {
        let dir = tempdir().unwrap();
        assert!(!ManifestStore::is_sealed_root(dir.path()));

        let store = ManifestStore::new(dir.path());
        store.append(&sample_document(1, None)).unwrap();
        assert!(ManifestStore::is_sealed_root(dir.path()));
    }

    #[test]
    fn locate_nested_roots_does_not_descend_past_a_boundary() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("A002");
        std::fs::create_dir_all(&nested).unwrap();
        ManifestStore::new(&nested)
            .append(&sample_document(1, None))
            .unwrap();

        let deeper = nested.join("deeper");
        std::fs::create_dir_all(&deeper).unwrap();

        let found = ManifestStore::locate_nested_roots(dir.path()).unwrap();
        assert_eq!(found, vec![nested]);
    }
}
