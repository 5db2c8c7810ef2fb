// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-file verification state machine (§4.6).

use crate::errors::HashError;
use crate::hash::hash_file;
use crate::history::HistoryIndex;
use ascmhl_metadata::{AlgorithmId, HashValue, VerificationOutcome};
use camino::Utf8Path;
use std::collections::BTreeMap;

/// The result of running the verifier on one file.
#[derive(Debug, Clone)]
pub struct VerifyResult {
    /// What happened when this file was checked against history.
    pub outcome: VerificationOutcome,
    /// Every hash observed for this file during this seal, in every
    /// algorithm history already knew plus the seal's primary algorithm.
    pub observed_hashes: BTreeMap<AlgorithmId, HashValue>,
}

/// Runs the verifier for one file: `Unknown -> Hashing -> outcome` (§4.6).
///
/// `history` must already contain every prior hash recorded for
/// `relative_path`, if any. `absolute_path` is hashed in whatever algorithms
/// history knows about for this path, plus `primary_algorithm`, in one pass.
pub fn verify_file(
    history: &HistoryIndex,
    relative_path: &Utf8Path,
    absolute_path: &Utf8Path,
    primary_algorithm: AlgorithmId,
) -> Result<VerifyResult, HashError> {
    let prior = history.known_hashes(relative_path);

    if prior.is_empty() {
        let observed = hash_file(absolute_path, [primary_algorithm])?;
        return Ok(VerifyResult {
            outcome: VerificationOutcome::NewFile,
            observed_hashes: observed,
        });
    }

    let mut algorithms: Vec<AlgorithmId> = prior.keys().copied().collect();
    if !prior.contains_key(&primary_algorithm) {
        algorithms.push(primary_algorithm);
    }
    let observed = hash_file(absolute_path, algorithms)?;

    // Tie-break (§4.6): recompute and verify every algorithm history knows
    // in the same pass; a mismatch in any one of them is a mismatch.
    let mismatch = prior.iter().find_map(|(algo, previous)| {
        observed
            .get(algo)
            .filter(|observed_hash| *observed_hash != previous)
            .map(|observed_hash| (previous.clone(), observed_hash.clone()))
    });

    let outcome = match mismatch {
        Some((previous, observed_hash)) => VerificationOutcome::HashMismatch {
            previous,
            observed: observed_hash,
        },
        None if !prior.contains_key(&primary_algorithm) => VerificationOutcome::VerifiedAndExtended,
        None => VerificationOutcome::Verified,
    };

    Ok(VerifyResult {
        outcome,
        observed_hashes: observed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascmhl_metadata::{FileRecord, GenerationDocument};
    use camino::Utf8PathBuf;
    use camino_tempfile::tempdir;
    use chrono::Utc;

    fn history_with(path: &str, algo: AlgorithmId, bytes: &[u8]) -> HistoryIndex {
        let hash = HashValue::new(algo, bytes.to_vec());
        let doc = GenerationDocument {
            generation_number: 1,
            previous_generation: None,
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
        };
        HistoryIndex::build(&[doc])
    }

    #[test]
    fn unseen_file_is_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mov");
        std::fs::write(&path, b"AAAAAAAA").unwrap();

        let history = HistoryIndex::default();
        let result = verify_file(&history, Utf8Path::new("a.mov"), &path, AlgorithmId::Xxh64).unwrap();
        assert!(matches!(result.outcome, VerificationOutcome::NewFile));
    }

    #[test]
    fn unchanged_file_verifies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mov");
        std::fs::write(&path, b"AAAAAAAA").unwrap();

        let observed = hash_file(Utf8Path::from_path(&path).unwrap(), [AlgorithmId::Xxh64]).unwrap();
        let recorded = observed[&AlgorithmId::Xxh64].clone();
        let history = history_with("a.mov", AlgorithmId::Xxh64, &recorded.bytes);

        let result = verify_file(&history, Utf8Path::new("a.mov"), &path, AlgorithmId::Xxh64).unwrap();
        assert!(matches!(result.outcome, VerificationOutcome::Verified));
    }

    #[test]
    fn extending_with_a_new_algorithm_reports_verified_and_extended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mov");
        std::fs::write(&path, b"AAAAAAAA").unwrap();

        let observed = hash_file(Utf8Path::from_path(&path).unwrap(), [AlgorithmId::Xxh64]).unwrap();
        let recorded = observed[&AlgorithmId::Xxh64].clone();
        let history = history_with("a.mov", AlgorithmId::Xxh64, &recorded.bytes);

        let result = verify_file(&history, Utf8Path::new("a.mov"), &path, AlgorithmId::Md5).unwrap();
        assert!(matches!(result.outcome, VerificationOutcome::VerifiedAndExtended));
        assert!(result.observed_hashes.contains_key(&AlgorithmId::Xxh64));
        assert!(result.observed_hashes.contains_key(&AlgorithmId::Md5));
    }

    #[test]
    fn altered_bytes_report_a_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mov");
        std::fs::write(&path, b"AAAAAAAA").unwrap();

        let history = history_with("a.mov", AlgorithmId::Xxh64, &[0xFFu8; 8]);

        let result = verify_file(&history, Utf8Path::new("a.mov"), &path, AlgorithmId::Xxh64).unwrap();
        assert!(matches!(result.outcome, VerificationOutcome::HashMismatch { .. }));
    }
}
