// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The directory walker (§4.5): enumerates a sealed root's tree in
//! post-order, canonical name order, skipping the manifest store directory,
//! ignored platform files, and delegating into nested sealed roots rather
//! than descending into them.
//!
//! Built on `walkdir` for entry metadata, but canonical ordering and
//! post-order composition are driven explicitly here rather than relying on
//! `walkdir`'s own traversal order. Per the design notes, the tree is built
//! with an explicit frame stack instead of recursion so depth isn't bounded
//! by the call stack.

use crate::errors::WalkError;
use crate::path::{byte_compare, join_relative};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;

/// Platform metadata entries skipped regardless of extension configuration.
pub const DEFAULT_IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "$RECYCLE.BIN", ".mhl"];

/// The name of the per-root file that extends [`DEFAULT_IGNORED_NAMES`].
pub const IGNORE_FILE_NAME: &str = ".mhlignore";

/// Bare file and directory names skipped by the walker, beyond the built-in
/// platform defaults. Read once per seal from a root's `.mhlignore` file, one
/// name per line; blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone, Default)]
pub struct IgnoreConfig {
    extra_names: HashSet<String>,
}

impl IgnoreConfig {
    /// An empty configuration: only [`DEFAULT_IGNORED_NAMES`] apply.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads `root`'s `.mhlignore` file, if present. A missing file is not an
    /// error; it simply means no extra names are ignored.
    pub fn load(root: &Utf8Path) -> Result<Self, WalkError> {
        let path = root.join(IGNORE_FILE_NAME);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(source) => return Err(WalkError::IgnoreFile { path, source }),
        };
        let extra_names = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Ok(Self { extra_names })
    }

    fn ignores(&self, name: &str) -> bool {
        DEFAULT_IGNORED_NAMES.contains(&name) || self.extra_names.contains(name)
    }
}

/// A file discovered by the walker.
#[derive(Debug, Clone)]
pub struct WalkFile {
    /// Path relative to the sealed root.
    pub relative_path: Utf8PathBuf,
    /// The file's location on disk.
    pub absolute_path: Utf8PathBuf,
}

/// A nested sealed root discovered by the walker. The orchestrator seals it
/// separately and feeds its resulting digests back in (§4.7 step 1).
#[derive(Debug, Clone)]
pub struct WalkNestedRoot {
    /// Path relative to the outer sealed root.
    pub relative_path: Utf8PathBuf,
}

/// An entry the walker declined to hash: a symlink, or another special file
/// type.
#[derive(Debug, Clone)]
pub struct WalkUnsupported {
    /// Path relative to the sealed root.
    pub relative_path: Utf8PathBuf,
    /// Why this entry was not treated as a regular file.
    pub reason: String,
}

/// A directory and its canonically ordered children.
#[derive(Debug, Clone)]
pub struct WalkDir {
    /// Path relative to the sealed root (empty for the root itself).
    pub relative_path: Utf8PathBuf,
    /// Immediate children, already sorted into canonical name order.
    pub children: Vec<WalkChild>,
}

/// One immediate child of a [`WalkDir`].
#[derive(Debug, Clone)]
pub enum WalkChild {
    File(WalkFile),
    Directory(WalkDir),
    NestedRoot(WalkNestedRoot),
    Unsupported(WalkUnsupported),
}

impl WalkChild {
    /// The child's bare name, used for canonical ordering.
    fn name(&self) -> &str {
        let path = match self {
            WalkChild::File(f) => &f.relative_path,
            WalkChild::Directory(d) => &d.relative_path,
            WalkChild::NestedRoot(n) => &n.relative_path,
            WalkChild::Unsupported(u) => &u.relative_path,
        };
        path.file_name().unwrap_or(path.as_str())
    }
}

/// Walks `root`, treating every path in `nested_roots` (relative to `root`)
/// as an opaque boundary not to be descended into, and skipping names from
/// `ignore` in addition to [`DEFAULT_IGNORED_NAMES`].
pub fn walk(
    root: &Utf8Path,
    nested_roots: &HashSet<Utf8PathBuf>,
    ignore: &IgnoreConfig,
) -> Result<WalkDir, WalkError> {
    let store_dir = root.join(crate::store::STORE_DIR_NAME);
    build_dir(root, Utf8PathBuf::new(), &store_dir, nested_roots, ignore)
}

fn build_dir(
    absolute_path: &Utf8Path,
    relative_path: Utf8PathBuf,
    store_dir: &Utf8Path,
    nested_roots: &HashSet<Utf8PathBuf>,
    ignore: &IgnoreConfig,
) -> Result<WalkDir, WalkError> {
    // One level of `walkdir` per directory: it already distinguishes
    // symlinks from followed entries without us re-deriving that from raw
    // `fs::read_dir` metadata, and leaves the recursive descent to this
    // function's own explicit call chain rather than walkdir's internal one.
    let mut names: Vec<(String, walkdir::DirEntry)> = Vec::new();
    for entry in walkdir::WalkDir::new(absolute_path.as_std_path())
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(|source| WalkError::Io {
            path: absolute_path.to_owned(),
            source,
        })?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        names.push((name, entry));
    }
    names.sort_by(|(a, _), (b, _)| byte_compare(a, b));

    let mut children = Vec::with_capacity(names.len());
    for (name, entry) in names {
        let child_absolute = Utf8PathBuf::from_path_buf(entry.path().to_path_buf())
            .unwrap_or_else(|path| Utf8PathBuf::from(path.to_string_lossy().into_owned()));

        if &child_absolute == store_dir {
            continue;
        }
        if name == IGNORE_FILE_NAME || ignore.ignores(&name) {
            continue;
        }

        let child_relative = join_relative(&relative_path, &name);
        let file_type = entry.file_type();

        if entry.path_is_symlink() {
            children.push(WalkChild::Unsupported(WalkUnsupported {
                relative_path: child_relative,
                reason: "symbolic links are not followed".to_string(),
            }));
        } else if file_type.is_dir() {
            if nested_roots.contains(&child_relative) {
                children.push(WalkChild::NestedRoot(WalkNestedRoot {
                    relative_path: child_relative,
                }));
            } else {
                let sub = build_dir(&child_absolute, child_relative, store_dir, nested_roots, ignore)?;
                children.push(WalkChild::Directory(sub));
            }
        } else if file_type.is_file() {
            children.push(WalkChild::File(WalkFile {
                relative_path: child_relative,
                absolute_path: child_absolute,
            }));
        } else {
            children.push(WalkChild::Unsupported(WalkUnsupported {
                relative_path: child_relative,
                reason: "not a regular file, directory, or symlink".to_string(),
            }));
        }
    }

    // Directory iteration order above already followed canonical name order,
    // but re-sort defensively since ignore/skip filtering happened in between.
    children.sort_by(|a, b| byte_compare(a.name(), b.name()));

    Ok(WalkDir {
        relative_path,
        children,
    })
}

/// Flattens a walked tree into every regular file it contains, in canonical
/// pre-order (good enough for dispatching to a hashing worker pool, which
/// does not care about directory boundaries).
pub fn flatten_files(dir: &WalkDir) -> Vec<WalkFile> {
    let mut out = Vec::new();
    flatten_files_inner(dir, &mut out);
    out
}

fn flatten_files_inner(dir: &WalkDir, out: &mut Vec<WalkFile>) {
    for child in &dir.children {
        match child {
            WalkChild::File(file) => out.push(file.clone()),
            WalkChild::Directory(sub) => flatten_files_inner(sub, out),
            WalkChild::NestedRoot(_) | WalkChild::Unsupported(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::tempdir;

    #[test]
    fn orders_children_byte_wise() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.mov"), b"b").unwrap();
        std::fs::write(dir.path().join("a.mov"), b"a").unwrap();

        let tree = walk(dir.path(), &HashSet::new(), &IgnoreConfig::empty()).unwrap();
        let names: Vec<&str> = tree
            .children
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, ["a.mov", "b.mov"]);
    }

    #[test]
    fn skips_ignored_platform_files_and_store_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("ascmhl")).unwrap();
        std::fs::write(dir.path().join("a.mov"), b"a").unwrap();

        let tree = walk(dir.path(), &HashSet::new(), &IgnoreConfig::empty()).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(matches!(&tree.children[0], WalkChild::File(f) if f.relative_path == "a.mov"));
    }

    #[test]
    fn mhlignore_extends_default_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".mhlignore"), "# comment\nProxies\n\nRender.log\n").unwrap();
        std::fs::create_dir(dir.path().join("Proxies")).unwrap();
        std::fs::write(dir.path().join("Proxies/p.mov"), b"p").unwrap();
        std::fs::write(dir.path().join("Render.log"), b"log").unwrap();
        std::fs::write(dir.path().join("a.mov"), b"a").unwrap();

        let ignore = IgnoreConfig::load(dir.path()).unwrap();
        let tree = walk(dir.path(), &HashSet::new(), &ignore).unwrap();
        let names: Vec<&str> = tree.children.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["a.mov"]);
    }

    #[test]
    fn missing_mhlignore_is_not_an_error() {
        let dir = tempdir().unwrap();
        let ignore = IgnoreConfig::load(dir.path()).unwrap();
        assert!(ignore.extra_names.is_empty());
    }

    #[test]
    fn treats_nested_roots_as_opaque() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("A002")).unwrap();
        std::fs::write(dir.path().join("A002/clip.mov"), b"x").unwrap();

        let mut nested = HashSet::new();
        nested.insert(Utf8PathBuf::from("A002"));

        let tree = walk(dir.path(), &nested, &IgnoreConfig::empty()).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert!(matches!(&tree.children[0], WalkChild::NestedRoot(_)));
    }

    #[test]
    fn flattens_nested_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Clips")).unwrap();
        std::fs::write(dir.path().join("Clips/a.mov"), b"a").unwrap();
        std::fs::write(dir.path().join("Sidecar.txt"), b"s").unwrap();

        let tree = walk(dir.path(), &HashSet::new(), &IgnoreConfig::empty()).unwrap();
        let files = flatten_files(&tree);
        let paths: Vec<String> = files.iter().map(|f| f.relative_path.to_string()).collect();
        assert_eq!(paths, ["Clips/a.mov", "Sidecar.txt"]);
    }

    #[test]
    #[cfg(unix)]
    fn symlinks_are_classified_as_unsupported() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.mov"), b"a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.mov"), dir.path().join("link.mov"))
            .expect("symlink should be created on Unix");

        let tree = walk(dir.path(), &HashSet::new(), &IgnoreConfig::empty()).unwrap();
        let unsupported = tree
            .children
            .iter()
            .find(|c| c.name() == "link.mov")
            .expect("symlink should still appear as a child");
        assert!(matches!(unsupported, WalkChild::Unsupported(u) if u.reason.contains("symbolic")));
    }
}
