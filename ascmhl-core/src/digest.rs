// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory digest composition (§4.2).
//!
//! Given a directory's immediate children in canonical name order, composes
//! two digests per algorithm: a content digest that changes iff any
//! descendant file's bytes change, and a structure digest that changes iff
//! the set of names/kinds changes.

use crate::hash::MultiHasher;
use crate::path::byte_compare;
use ascmhl_metadata::{AlgorithmId, HashValue};
use std::collections::BTreeMap;

/// The kind of a directory child, for structure-digest purposes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChildKind {
    /// A regular file (or a nested sealed root, treated as an opaque file-like leaf).
    File,
    /// A directory this engine walked and computed digests for.
    Directory,
}

/// One immediate child of a directory, as presented to [`compose`].
///
/// For files: `content_hash` is the file's hash; `structure_hash` is unused
/// (`None`). For directories: `content_hash` is the child's own content
/// digest and `structure_hash` is the child's own structure digest.
pub struct Child<'a> {
    /// The child's name (not a full path), already normalized.
    pub name: &'a str,
    /// Whether this child is a file or a directory.
    pub kind: ChildKind,
    /// The child's content-digest bytes in the algorithm being composed.
    pub content_hash: &'a [u8],
    /// The child's structure-digest bytes in the algorithm being composed,
    /// present only for directory children.
    pub structure_hash: Option<&'a [u8]>,
}

/// The pair of digests produced by [`compose`] for one algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirDigestPair {
    /// Changes iff a descendant file's bytes change.
    pub content: HashValue,
    /// Changes iff the set of descendant names/kinds changes.
    pub structure: HashValue,
}

/// Composes a directory's content and structure digest in `algorithm` from
/// its immediate children.
///
/// `children` need not already be sorted; this function sorts a copy by
/// byte-wise name comparison before folding, per §4.2's canonical order rule.
pub fn compose(algorithm: AlgorithmId, children: &mut [Child<'_>]) -> DirDigestPair {
    children.sort_by(|a, b| byte_compare(a.name, b.name));

    let mut content_hasher = MultiHasher::new([algorithm]);
    let mut structure_hasher = MultiHasher::new([algorithm]);

    for child in children.iter() {
        content_hasher.update(child.name.as_bytes());
        content_hasher.update(&[0x00]);
        content_hasher.update(child.content_hash);

        structure_hasher.update(child.name.as_bytes());
        structure_hasher.update(&[0x00]);
        match child.kind {
            ChildKind::File => structure_hasher.update(b"f"),
            ChildKind::Directory => {
                structure_hasher.update(b"d");
                if let Some(structure_hash) = child.structure_hash {
                    structure_hasher.update(structure_hash);
                }
            }
        }
    }
    // Trailing separator terminates the content-digest stream (§4.2).
    content_hasher.update(&[0x00]);

    let mut content_result = content_hasher.finalize();
    let mut structure_result = structure_hasher.finalize();

    DirDigestPair {
        content: content_result.remove(&algorithm).expect("algorithm present"),
        structure: structure_result
            .remove(&algorithm)
            .expect("algorithm present"),
    }
}

/// Composes a directory's digests in every requested algorithm at once.
pub fn compose_all(
    algorithms: &[AlgorithmId],
    children_by_algorithm: impl Fn(AlgorithmId) -> Vec<Child<'_>>,
) -> BTreeMap<AlgorithmId, DirDigestPair> {
    algorithms
        .iter()
        .map(|&algo| {
            let mut children = children_by_algorithm(algo);
            (algo, compose(algo, &mut children))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_child<'a>(name: &'a str, hash: &'a [u8]) -> Child<'a> {
        Child {
            name,
            kind: ChildKind::File,
            content_hash: hash,
            structure_hash: None,
        }
    }

    #[test]
    fn content_digest_unaffected_by_directory_name() {
        let hash_a = vec![1u8; 8];
        let mut children_1 = [file_child("a.mov", &hash_a)];
        let mut children_2 = [file_child("a.mov", &hash_a)];

        let d1 = compose(AlgorithmId::Xxh64, &mut children_1);
        let d2 = compose(AlgorithmId::Xxh64, &mut children_2);
        // Same children -> same digests regardless of which directory holds them.
        assert_eq!(d1.content, d2.content);
    }

    #[test]
    fn structure_digest_ignores_file_content_changes() {
        let hash_a = vec![1u8; 8];
        let hash_b = vec![2u8; 8];

        let mut children_1 = [file_child("a.mov", &hash_a)];
        let mut children_2 = [file_child("a.mov", &hash_b)];

        let d1 = compose(AlgorithmId::Xxh64, &mut children_1);
        let d2 = compose(AlgorithmId::Xxh64, &mut children_2);

        assert_eq!(d1.structure, d2.structure);
        assert_ne!(d1.content, d2.content);
    }

    #[test]
    fn renaming_a_child_changes_both_digests() {
        let hash_a = vec![1u8; 8];
        let mut children_1 = [file_child("a.mov", &hash_a)];
        let mut children_2 = [file_child("b.mov", &hash_a)];

        let d1 = compose(AlgorithmId::Xxh64, &mut children_1);
        let d2 = compose(AlgorithmId::Xxh64, &mut children_2);

        assert_ne!(d1.content, d2.content);
        assert_ne!(d1.structure, d2.structure);
    }

    #[test]
    fn child_order_is_canonicalized_before_composing() {
        let hash_a = vec![1u8; 8];
        let hash_b = vec![2u8; 8];

        let mut in_order = [file_child("a.mov", &hash_a), file_child("b.mov", &hash_b)];
        let mut reversed = [file_child("b.mov", &hash_b), file_child("a.mov", &hash_a)];

        let d1 = compose(AlgorithmId::Xxh64, &mut in_order);
        let d2 = compose(AlgorithmId::Xxh64, &mut reversed);

        assert_eq!(d1.content, d2.content);
        assert_eq!(d1.structure, d2.structure);
    }
}
