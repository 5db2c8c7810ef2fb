// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::algorithm::HashValue;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of one seal, as written by `ManifestStore::append`.
///
/// A `GenerationDocument` never changes once it has been written to disk;
/// later seals only ever produce a new generation that references this one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationDocument {
    /// 1-based, contiguous within a sealed root.
    pub generation_number: u32,
    /// `None` only for generation 1.
    pub previous_generation: Option<u32>,
    /// Wall-clock time the seal was performed, in UTC.
    pub created_at: DateTime<Utc>,
    /// Hostname of the machine that performed the seal.
    pub creator_host: String,
    /// Username that performed the seal.
    pub creator_user: String,
    /// The sealed root's directory name, used when naming the generation file.
    pub root_name: String,
    /// Every file this seal observed, whether newly discovered, re-verified, or failing.
    pub files: Vec<FileRecord>,
    /// Every directory this seal computed digests for, including the root
    /// itself (recorded at path `""`).
    pub directories: Vec<DirectoryRecord>,
    /// Paths known from prior generations that were not found on disk this seal.
    pub missing: Vec<MissingRecord>,
    /// Nested sealed roots absorbed by this generation, by relative path.
    pub child_histories: Vec<ChildHistoryRecord>,
}

impl GenerationDocument {
    /// Returns the directory record for the sealed root itself.
    pub fn root_directory(&self) -> Option<&DirectoryRecord> {
        self.directories.iter().find(|d| d.path.as_str().is_empty())
    }

    /// Returns true if every file this generation touched verified cleanly
    /// and no prior entry went missing.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self
                .files
                .iter()
                .all(|f| f.outcome.is_success())
    }
}

/// One file entry as recorded in a single generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the sealed root, normalized per the rules in
    /// `ascmhl_core::path`.
    pub path: Utf8PathBuf,
    /// Size in bytes, as observed at seal time.
    pub size: u64,
    /// Last-modified timestamp, as observed at seal time. Recorded but not
    /// authoritative for verification.
    pub last_modified: Option<DateTime<Utc>>,
    /// Every hash computed for this file during this seal (not the full
    /// history — just what this generation newly verified or added).
    pub hashes: Vec<HashValue>,
    /// What the verifier concluded about this file.
    pub outcome: VerificationOutcome,
}

/// Two digests (content and structure), one hash value each, for a directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Path relative to the sealed root. The sealed root itself is recorded
    /// at the empty path.
    pub path: Utf8PathBuf,
    /// Content digest in every algorithm this seal computed it in.
    pub content_digests: Vec<HashValue>,
    /// Structure digest in every algorithm this seal computed it in.
    pub structure_digests: Vec<HashValue>,
}

/// A path known from prior generations that this seal did not find on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissingRecord {
    /// Path relative to the sealed root.
    pub path: Utf8PathBuf,
    /// The most recent generation that observed this path present.
    pub last_known_generation: u32,
}

/// A reference to a nested sealed root absorbed into this generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChildHistoryRecord {
    /// Path of the nested root, relative to this generation's sealed root.
    pub relative_path: Utf8PathBuf,
    /// The nested root's generation number as of this seal.
    pub generation_number: u32,
    /// The nested root's content digest at that generation.
    pub root_content_hash: HashValue,
    /// The nested root's structure digest at that generation.
    pub root_structure_hash: HashValue,
}

/// The outcome the per-file verification state machine settled on.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// First time this path has ever been seen in this sealed root's history.
    NewFile,
    /// Every previously recorded hash matched; no new algorithm was added.
    Verified,
    /// Every previously recorded hash matched, and a new algorithm was added.
    VerifiedAndExtended,
    /// A previously recorded hash did not match what was observed on disk.
    HashMismatch {
        /// The hash recorded in a prior generation.
        previous: HashValue,
        /// The hash computed during this seal.
        observed: HashValue,
    },
    /// The path is known from prior generations but absent on disk.
    Missing,
    /// A symlink or other special file the walker does not hash.
    UnsupportedEntry {
        /// Human-readable reason, e.g. "symbolic link".
        reason: String,
    },
}

impl VerificationOutcome {
    /// Returns true for outcomes that don't affect the seal's exit code:
    /// `NewFile`, `Verified`, `VerifiedAndExtended`, and `UnsupportedEntry`
    /// (a note, not a failure — §7).
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            VerificationOutcome::NewFile
                | VerificationOutcome::Verified
                | VerificationOutcome::VerifiedAndExtended
                | VerificationOutcome::UnsupportedEntry { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::AlgorithmId;

    #[test]
    fn generation_document_round_trips_through_json() {
        let doc = GenerationDocument {
            generation_number: 1,
            previous_generation: None,
            created_at: DateTime::from_timestamp(0, 0).expect("valid timestamp"),
            creator_host: "workstation".to_string(),
            creator_user: "operator".to_string(),
            root_name: "R".to_string(),
            files: vec![FileRecord {
                path: Utf8PathBuf::from("Clips/a.mov"),
                size: 8,
                last_modified: None,
                hashes: vec![HashValue::new(AlgorithmId::Xxh64, vec![0u8; 8])],
                outcome: VerificationOutcome::NewFile,
            }],
            directories: vec![DirectoryRecord {
                path: Utf8PathBuf::from(""),
                content_digests: vec![HashValue::new(AlgorithmId::Xxh64, vec![1u8; 8])],
                structure_digests: vec![HashValue::new(AlgorithmId::Xxh64, vec![2u8; 8])],
            }],
            missing: Vec::new(),
            child_histories: Vec::new(),
        };

        let json = serde_json::to_string_pretty(&doc).expect("serialize");
        let round_tripped: GenerationDocument =
            serde_json::from_str(&json).expect("deserialize");

        assert_eq!(round_tripped.generation_number, 1);
        assert_eq!(round_tripped.files.len(), 1);
        assert!(round_tripped.is_clean());
        assert!(round_tripped.root_directory().is_some());
    }

    #[test]
    fn hash_mismatch_is_not_success() {
        let outcome = VerificationOutcome::HashMismatch {
            previous: HashValue::new(AlgorithmId::Xxh64, vec![0u8; 8]),
            observed: HashValue::new(AlgorithmId::Xxh64, vec![1u8; 8]),
        };
        assert!(!outcome.is_success());
    }

    #[test]
    fn unsupported_entry_is_a_note_not_a_failure() {
        let outcome = VerificationOutcome::UnsupportedEntry {
            reason: "symbolic links are not followed".to_string(),
        };
        assert!(outcome.is_success());
    }
}
