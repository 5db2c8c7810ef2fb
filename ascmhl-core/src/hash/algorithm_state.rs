// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-algorithm streaming hash state.
//!
//! `xxhash-rust` doesn't implement `digest::Digest`, so unlike a
//! `Box<dyn DynDigest>` table this is a plain enum dispatch over the five
//! algorithms the engine recognizes.

use ascmhl_metadata::AlgorithmId;
use digest::Digest;
use md5::Md5;
use sha1::Sha1;
use sha2::Sha512;
use xxhash_rust::xxh3::Xxh3;
use xxhash_rust::xxh64::Xxh64;

/// `cidv1` + `sha2-512` multicodec prefix bytes c4 digests are tagged with
/// before base58 encoding.
const C4_PREFIX: [u8; 2] = [0x01, 0x55];

pub(super) enum AlgorithmState {
    Xxh64(Xxh64),
    Xxh128(Xxh3),
    Md5(Md5),
    Sha1(Sha1),
    C4(Sha512),
}

impl AlgorithmState {
    pub(super) fn new(algorithm: AlgorithmId) -> Self {
        match algorithm {
            AlgorithmId::Xxh64 => AlgorithmState::Xxh64(Xxh64::new(0)),
            AlgorithmId::Xxh128 => AlgorithmState::Xxh128(Xxh3::new()),
            AlgorithmId::Md5 => AlgorithmState::Md5(Md5::new()),
            AlgorithmId::Sha1 => AlgorithmState::Sha1(Sha1::new()),
            AlgorithmId::C4 => AlgorithmState::C4(Sha512::new()),
        }
    }

    pub(super) fn update(&mut self, bytes: &[u8]) {
        match self {
            AlgorithmState::Xxh64(state) => state.update(bytes),
            AlgorithmState::Xxh128(state) => state.update(bytes),
            AlgorithmState::Md5(state) => Digest::update(state, bytes),
            AlgorithmState::Sha1(state) => Digest::update(state, bytes),
            AlgorithmState::C4(state) => Digest::update(state, bytes),
        }
    }

    pub(super) fn finalize(self) -> Vec<u8> {
        match self {
            AlgorithmState::Xxh64(state) => state.digest().to_be_bytes().to_vec(),
            AlgorithmState::Xxh128(state) => state.digest128().to_be_bytes().to_vec(),
            AlgorithmState::Md5(state) => state.finalize().to_vec(),
            AlgorithmState::Sha1(state) => state.finalize().to_vec(),
            AlgorithmState::C4(state) => {
                let sha512 = state.finalize();
                let mut out = Vec::with_capacity(C4_PREFIX.len() + sha512.len());
                out.extend_from_slice(&C4_PREFIX);
                out.extend_from_slice(&sha512);
                out
            }
        }
    }
}
