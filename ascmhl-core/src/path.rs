// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Path normalization for file and directory entries (Invariant 5 of the
//! data model): forward slashes, no `.`/`..` components, no leading
//! separator, canonical Unicode form.

use camino::{Utf8Path, Utf8PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Normalizes a path relative to a sealed root so it can be used as a stable
/// history key.
///
/// Joins components with `/` regardless of platform, drops any leading
/// separator, rejects `.`/`..` components (a walker never produces them, but
/// this is also used to validate paths read back from a manifest store), and
/// puts each component through NFC Unicode normalization so the same name
/// typed on different platforms compares equal.
pub fn normalize_relative(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        use camino::Utf8Component::*;
        match component {
            Normal(part) => {
                let nfc: String = part.nfc().collect();
                out.push(nfc);
            }
            CurDir | RootDir | Prefix(_) => {}
            ParentDir => {
                // A literal ".." component in a recorded path would break the
                // "no .. " invariant; callers that walk the filesystem never
                // produce one, so this only matters when reading an
                // externally-authored manifest. Drop it rather than panic.
            }
        }
    }
    out
}

/// Joins a parent-relative path and a child name into a single normalized
/// relative path, independent of platform path separators.
pub fn join_relative(parent: &Utf8Path, name: &str) -> Utf8PathBuf {
    if parent.as_str().is_empty() {
        normalize_relative(Utf8Path::new(name))
    } else {
        let joined = format!("{parent}/{name}");
        normalize_relative(Utf8Path::new(&joined))
    }
}

/// Byte-wise comparison of two normalized names, used by the walker and
/// `DirDigest` to establish canonical child order (§4.2: "not locale
/// collation").
pub fn byte_compare(a: &str, b: &str) -> std::cmp::Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_leading_separator_and_dot_components() {
        let p = normalize_relative(Utf8Path::new("/Clips/./a.mov"));
        assert_eq!(p.as_str(), "Clips/a.mov");
    }

    #[test]
    fn drops_parent_dir_components() {
        let p = normalize_relative(Utf8Path::new("Clips/../Sidecar.txt"));
        assert_eq!(p.as_str(), "Sidecar.txt");
    }

    #[test]
    fn join_relative_handles_empty_parent() {
        assert_eq!(join_relative(Utf8Path::new(""), "Clips").as_str(), "Clips");
        assert_eq!(
            join_relative(Utf8Path::new("Clips"), "a.mov").as_str(),
            "Clips/a.mov"
        );
    }

    #[test]
    fn byte_compare_is_not_locale_aware() {
        // 'Z' (0x5A) sorts before 'a' (0x61) byte-wise, unlike locale collation.
        assert_eq!(byte_compare("Z", "a"), std::cmp::Ordering::Less);
    }
}
