// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hash engine: streams a byte source through one or more hash
//! primitives in a single pass.
//!
//! Contract (§4.1): given a readable byte source and an ordered set of
//! algorithm ids, produce the final digest for each algorithm after exactly
//! one pass over the bytes. Empty files produce each algorithm's
//! empty-input digest, which falls out naturally here since a hash state
//! that's never updated finalizes to exactly that value.

mod algorithm_state;

use crate::errors::HashError;
use algorithm_state::AlgorithmState;
use ascmhl_metadata::{AlgorithmId, HashValue};
use camino::Utf8Path;
use std::collections::BTreeMap;
use std::io::Read;

/// The size of each chunk read from the byte source per `update` call.
const CHUNK_SIZE: usize = 64 * 1024;

/// Drives an ordered set of hash algorithms over a single byte stream.
///
/// Construct one per file, feed it bytes via [`Self::update`], then call
/// [`Self::finalize`] once every byte has been seen.
pub struct MultiHasher {
    states: Vec<(AlgorithmId, AlgorithmState)>,
}

impl MultiHasher {
    /// Creates a hasher that will compute a digest in every algorithm in
    /// `algorithms`. Duplicate ids are collapsed to one state each.
    pub fn new(algorithms: impl IntoIterator<Item = AlgorithmId>) -> Self {
        let mut seen = Vec::new();
        for algo in algorithms {
            if !seen.iter().any(|(id, _)| *id == algo) {
                seen.push((algo, AlgorithmState::new(algo)));
            }
        }
        Self { states: seen }
    }

    /// Feeds the next chunk of bytes to every algorithm in this hasher.
    pub fn update(&mut self, bytes: &[u8]) {
        for (_, state) in &mut self.states {
            state.update(bytes);
        }
    }

    /// Finalizes every algorithm, returning one hash value each.
    pub fn finalize(self) -> BTreeMap<AlgorithmId, HashValue> {
        self.states
            .into_iter()
            .map(|(algo, state)| (algo, HashValue::new(algo, state.finalize())))
            .collect()
    }
}

/// Hashes a file's raw byte content in every requested algorithm, streaming
/// it through in one pass.
pub fn hash_file(
    path: &Utf8Path,
    algorithms: impl IntoIterator<Item = AlgorithmId>,
) -> Result<BTreeMap<AlgorithmId, HashValue>, HashError> {
    let mut file = std::fs::File::open(path).map_err(|source| HashError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut hasher = MultiHasher::new(algorithms);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|source| HashError::Io {
            path: path.to_owned(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::tempdir;
    use std::io::Write;

    #[test]
    fn empty_file_produces_empty_input_digests() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::File::create(&path).unwrap();

        let hashes = hash_file(&path, [AlgorithmId::Xxh64, AlgorithmId::Md5]).unwrap();
        assert_eq!(hashes.len(), 2);

        // MD5 of the empty string is well known.
        let md5 = &hashes[&AlgorithmId::Md5];
        assert_eq!(md5.encoded(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn single_pass_computes_all_requested_algorithms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.mov");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"AAAAAAAA").unwrap();
        drop(f);

        let hashes = hash_file(
            &path,
            [AlgorithmId::Xxh64, AlgorithmId::Sha1, AlgorithmId::C4],
        )
        .unwrap();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.contains_key(&AlgorithmId::Xxh64));
        assert!(hashes.contains_key(&AlgorithmId::Sha1));
        assert!(hashes.contains_key(&AlgorithmId::C4));
    }

    #[test]
    fn same_content_produces_same_hash_regardless_of_chunking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        let data = vec![0x5Au8; CHUNK_SIZE * 3 + 17];
        f.write_all(&data).unwrap();
        drop(f);

        let hashes = hash_file(&path, [AlgorithmId::Xxh64]).unwrap();

        let mut hasher = MultiHasher::new([AlgorithmId::Xxh64]);
        hasher.update(&data);
        let direct = hasher.finalize();

        assert_eq!(hashes[&AlgorithmId::Xxh64], direct[&AlgorithmId::Xxh64]);
    }
}
