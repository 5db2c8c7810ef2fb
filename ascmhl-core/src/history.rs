// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The history index (§4.4): an in-memory replay of every generation a
//! sealed root has ever recorded, keyed by relative path.

use ascmhl_metadata::{AlgorithmId, ChildHistoryRecord, GenerationDocument, HashValue};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};

/// What the index remembers about one path across every generation it has
/// seen.
#[derive(Debug, Default, Clone)]
struct PathHistory {
    /// The most recent hash recorded for each algorithm, and the generation
    /// that recorded it. Per Invariant 2, once written a value here is never
    /// replaced by a later generation — only added to in new algorithms.
    hashes: BTreeMap<AlgorithmId, (HashValue, u32)>,
    last_present_generation: Option<u32>,
    last_missing_generation: Option<u32>,
}

/// The replayed aggregate of every prior generation for one sealed root.
///
/// Built once via [`HistoryIndex::build`] and treated as read-only for the
/// remainder of a seal (§5: "the HistoryIndex is read-only after
/// construction").
#[derive(Debug, Default)]
pub struct HistoryIndex {
    entries: BTreeMap<Utf8PathBuf, PathHistory>,
    child_histories: Vec<ChildHistoryRecord>,
}

impl HistoryIndex {
    /// Replays `documents` (expected to be generations `1..N` in order) into
    /// an index.
    pub fn build(documents: &[GenerationDocument]) -> Self {
        let mut index = HistoryIndex::default();
        for document in documents {
            for file in &document.files {
                let entry = index.entries.entry(file.path.clone()).or_default();
                entry.last_present_generation = Some(document.generation_number);
                for hash in &file.hashes {
                    entry
                        .hashes
                        .entry(hash.algorithm)
                        .or_insert_with(|| (hash.clone(), document.generation_number));
                }
            }
            for directory in &document.directories {
                index.entries.entry(directory.path.clone()).or_default();
            }
            for missing in &document.missing {
                let entry = index.entries.entry(missing.path.clone()).or_default();
                entry.last_missing_generation = Some(document.generation_number);
            }
            // Later generations' child-history references supersede earlier
            // ones for the same relative path.
            for child in &document.child_histories {
                index
                    .child_histories
                    .retain(|existing| existing.relative_path != child.relative_path);
                index.child_histories.push(child.clone());
            }
        }
        index
    }

    /// The most recently recorded hash in every algorithm known for `path`.
    pub fn known_hashes(&self, path: &Utf8Path) -> BTreeMap<AlgorithmId, HashValue> {
        self.entries
            .get(path)
            .map(|history| {
                history
                    .hashes
                    .iter()
                    .map(|(&algo, (hash, _generation))| (algo, hash.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True iff any generation has ever recorded `path` (as a file, a
    /// directory, or a missing entry).
    pub fn is_known(&self, path: &Utf8Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Every path any generation has ever recorded.
    pub fn all_known_paths(&self) -> BTreeSet<Utf8PathBuf> {
        self.entries.keys().cloned().collect()
    }

    /// The generation that most recently observed `path` present on disk, if
    /// any.
    pub fn last_present_generation(&self, path: &Utf8Path) -> Option<u32> {
        self.entries.get(path).and_then(|h| h.last_present_generation)
    }

    /// The generation that most recently observed `path` missing, if any.
    pub fn last_missing_generation(&self, path: &Utf8Path) -> Option<u32> {
        self.entries.get(path).and_then(|h| h.last_missing_generation)
    }

    /// True iff the most recent observation of `path` was "missing" (i.e. it
    /// hasn't been seen present again since).
    pub fn is_currently_missing(&self, path: &Utf8Path) -> bool {
        let Some(history) = self.entries.get(path) else {
            return false;
        };
        match (history.last_present_generation, history.last_missing_generation) {
            (Some(present), Some(missing)) => missing > present,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    /// Nested sealed-root references absorbed into this root's prior
    /// generations, keyed by relative path.
    pub fn child_histories(&self) -> &[ChildHistoryRecord] {
        &self.child_histories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascmhl_metadata::{FileRecord, VerificationOutcome};
    use chrono::Utc;

    fn doc_with_file(
        generation_number: u32,
        previous_generation: Option<u32>,
        path: &str,
        hash: HashValue,
    ) -> GenerationDocument {
        GenerationDocument {
            generation_number,
            previous_generation,
            created_at: Utc::now(),
            creator_host: "host".to_string(),
            creator_user: "user".to_string(),
            root_name: "R".to_string(),
            files: vec![FileRecord {
                path: Utf8PathBuf::from(path),
                size: 8,
                last_modified: None,
                hashes: vec![hash],
                outcome: VerificationOutcome::NewFile,
            }],
            directories: Vec::new(),
            missing: Vec::new(),
            child_histories: Vec::new(),
        }
    }

    #[test]
    fn replays_hashes_across_generations() {
        let hash = HashValue::new(AlgorithmId::Xxh64, vec![1; 8]);
        let doc = doc_with_file(1, None, "a.mov", hash.clone());
        let index = HistoryIndex::build(&[doc]);

        assert!(index.is_known(Utf8Path::new("a.mov")));
        let known = index.known_hashes(Utf8Path::new("a.mov"));
        assert_eq!(known.get(&AlgorithmId::Xxh64), Some(&hash));
    }

    #[test]
    fn does_not_overwrite_earlier_recorded_hash() {
        let hash1 = HashValue::new(AlgorithmId::Xxh64, vec![1; 8]);
        let hash2 = HashValue::new(AlgorithmId::Xxh64, vec![2; 8]);
        let doc1 = doc_with_file(1, None, "a.mov", hash1.clone());
        let mut doc2 = doc_with_file(2, Some(1), "a.mov", hash2);
        doc2.files[0].outcome = VerificationOutcome::Verified;
        let index = HistoryIndex::build(&[doc1, doc2]);

        // Invariant 2: the recorded hash stays the one from generation 1.
        let known = index.known_hashes(Utf8Path::new("a.mov"));
        assert_eq!(known.get(&AlgorithmId::Xxh64), Some(&hash1));
    }

    #[test]
    fn tracks_missing_after_present() {
        let hash = HashValue::new(AlgorithmId::Xxh64, vec![1; 8]);
        let doc1 = doc_with_file(1, None, "a.mov", hash);
        let mut doc2 = GenerationDocument {
            generation_number: 2,
            previous_generation: Some(1),
            created_at: Utc::now(),
            creator_host: "host".to_string(),
            creator_user: "user".to_string(),
            root_name: "R".to_string(),
            files: Vec::new(),
            directories: Vec::new(),
            missing: vec![ascmhl_metadata::MissingRecord {
                path: Utf8PathBuf::from("a.mov"),
                last_known_generation: 1,
            }],
            child_histories: Vec::new(),
        };
        doc2.missing[0].last_known_generation = 1;

        let index = HistoryIndex::build(&[doc1, doc2]);
        assert!(index.is_currently_missing(Utf8Path::new("a.mov")));
    }
}
