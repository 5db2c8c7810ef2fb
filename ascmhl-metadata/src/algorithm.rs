// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the hash primitives the engine recognizes.
///
/// The core hashing capability lives in `ascmhl-core`; this enum is the
/// stable, serializable identifier that generation documents reference.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmId {
    /// 64-bit xxHash. The default primary algorithm.
    Xxh64,
    /// 128-bit xxHash3.
    Xxh128,
    /// MD5, kept for interoperability with legacy manifests.
    Md5,
    /// SHA-1, kept for interoperability with legacy manifests.
    Sha1,
    /// The c4 content-addressable identifier: SHA-512 plus a multihash-style
    /// prefix, base58 encoded.
    C4,
}

impl AlgorithmId {
    /// All algorithm ids the engine recognizes, in the order `--hash` accepts them.
    pub const ALL: [AlgorithmId; 5] = [
        AlgorithmId::Xxh64,
        AlgorithmId::Xxh128,
        AlgorithmId::Md5,
        AlgorithmId::Sha1,
        AlgorithmId::C4,
    ];

    /// The raw digest width in bytes, before any string encoding.
    pub fn digest_size(self) -> usize {
        match self {
            AlgorithmId::Xxh64 => 8,
            AlgorithmId::Xxh128 => 16,
            AlgorithmId::Md5 => 16,
            AlgorithmId::Sha1 => 20,
            // c4 stores a 2-byte multihash prefix plus a 64-byte sha512 digest.
            AlgorithmId::C4 => 66,
        }
    }

    /// The canonical lowercase name used in CLI flags and manifest documents.
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmId::Xxh64 => "xxh64",
            AlgorithmId::Xxh128 => "xxh128",
            AlgorithmId::Md5 => "md5",
            AlgorithmId::Sha1 => "sha1",
            AlgorithmId::C4 => "c4",
        }
    }

    /// Encodes a digest's raw bytes in this algorithm's canonical string form:
    /// lowercase hex for every algorithm except `c4`, which uses base58.
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            AlgorithmId::C4 => bs58::encode(bytes).into_string(),
            _ => hex::encode(bytes),
        }
    }

    /// Decodes a digest previously produced by [`Self::encode`].
    pub fn decode(self, s: &str) -> Result<Vec<u8>, AlgorithmError> {
        let bytes = match self {
            AlgorithmId::C4 => bs58::decode(s)
                .into_vec()
                .map_err(|_| AlgorithmError::MalformedDigest {
                    algorithm: self,
                    value: s.to_string(),
                })?,
            _ => hex::decode(s).map_err(|_| AlgorithmError::MalformedDigest {
                algorithm: self,
                value: s.to_string(),
            })?,
        };
        if bytes.len() != self.digest_size() {
            return Err(AlgorithmError::MalformedDigest {
                algorithm: self,
                value: s.to_string(),
            });
        }
        Ok(bytes)
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlgorithmId {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xxh64" => Ok(AlgorithmId::Xxh64),
            "xxh128" => Ok(AlgorithmId::Xxh128),
            "md5" => Ok(AlgorithmId::Md5),
            "sha1" => Ok(AlgorithmId::Sha1),
            "c4" => Ok(AlgorithmId::C4),
            other => Err(AlgorithmError::UnknownAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}

/// Errors that can occur while parsing or decoding algorithm-related values.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AlgorithmError {
    /// The requested algorithm name isn't one the engine recognizes.
    #[error(
        "unrecognized hash algorithm `{name}` (known algorithms: xxh64, xxh128, md5, sha1, c4)"
    )]
    UnknownAlgorithm {
        /// The unrecognized name, as supplied by the caller.
        name: String,
    },
    /// A digest string failed to decode, or decoded to the wrong width.
    #[error("malformed {algorithm} digest: `{value}`")]
    MalformedDigest {
        /// The algorithm the digest was supposed to belong to.
        algorithm: AlgorithmId,
        /// The offending string.
        value: String,
    },
}

/// An algorithm id paired with the digest bytes it produced.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HashValue {
    /// Which algorithm produced [`Self::bytes`].
    pub algorithm: AlgorithmId,
    /// The raw digest bytes.
    #[serde(with = "hash_bytes")]
    pub bytes: Vec<u8>,
}

impl HashValue {
    /// Creates a new hash value, encoding `bytes` per `algorithm`'s canonical form.
    pub fn new(algorithm: AlgorithmId, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// Renders the digest in its canonical string form (hex, or base58 for c4).
    pub fn encoded(&self) -> String {
        self.algorithm.encode(&self.bytes)
    }
}

/// Stores hash bytes as hex in JSON regardless of algorithm, so generation
/// documents stay human-readable and diffable. `c4`'s base58 form is a
/// display-only rendering produced by [`HashValue::encoded`].
mod hash_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hex::encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxh64_round_trips_through_hex() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04];
        let encoded = AlgorithmId::Xxh64.encode(&bytes);
        assert_eq!(encoded, "deadbeef01020304");
        assert_eq!(AlgorithmId::Xxh64.decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn c4_round_trips_through_base58() {
        let bytes = vec![1u8; AlgorithmId::C4.digest_size()];
        let encoded = AlgorithmId::C4.encode(&bytes);
        assert_eq!(AlgorithmId::C4.decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn decode_rejects_wrong_width() {
        let err = AlgorithmId::Md5.decode("deadbeef").unwrap_err();
        assert!(matches!(err, AlgorithmError::MalformedDigest { .. }));
    }

    #[test]
    fn from_str_rejects_unknown_names() {
        let err: AlgorithmError = "blake3".parse::<AlgorithmId>().unwrap_err();
        assert!(matches!(err, AlgorithmError::UnknownAlgorithm { .. }));
    }

    #[test]
    fn display_matches_as_str() {
        for algo in AlgorithmId::ALL {
            assert_eq!(algo.to_string(), algo.as_str());
        }
    }
}
