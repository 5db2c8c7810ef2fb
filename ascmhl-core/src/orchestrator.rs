// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seal orchestrator (§4.7): drives one seal operation end to end.

use crate::digest::{self, ChildKind};
use crate::errors::SealError;
use crate::history::HistoryIndex;
use crate::progress::ProgressSink;
use crate::store::ManifestStore;
use crate::verify::{self, VerifyResult};
use crate::walker::{self, IgnoreConfig, WalkChild, WalkDir, WalkFile};
use ascmhl_metadata::{
    AlgorithmId, ChildHistoryRecord, DirectoryRecord, FileRecord, GenerationDocument, HashValue,
    MissingRecord, VerificationOutcome,
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Configuration for one seal invocation, threaded through nested-root seals
/// unchanged (§4.7: nested roots are sealed "first, depth-first", in the
/// same algorithm as their parent).
#[derive(Clone)]
pub struct SealOptions {
    /// The primary algorithm this seal hashes new and existing files in.
    pub algorithm: AlgorithmId,
    /// Size of the bounded worker pool used for the hashing stage (§5).
    pub worker_count: usize,
    /// Polled between files, after the hashing stage, and between sealed
    /// roots; an in-flight hash always runs to completion, and a
    /// cancellation observed at any of these points aborts before any
    /// generation is written for the root in progress.
    pub cancel: Arc<AtomicBool>,
}

impl SealOptions {
    /// A reasonable default: `xxh64`, parallelism matching the machine, no
    /// cancellation.
    pub fn new(algorithm: AlgorithmId) -> Self {
        Self {
            algorithm,
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// The result of sealing one root, including every nested root sealed along
/// the way.
#[derive(Debug, Clone)]
pub struct SealReport {
    /// The sealed root this report is for.
    pub root: Utf8PathBuf,
    /// The generation number just written.
    pub generation_number: u32,
    /// Path of the new generation file, relative to `root`.
    pub manifest_relative_path: Utf8PathBuf,
    /// False if this seal recorded any `HashMismatch` or `Missing` outcome
    /// (§4.7 step 6).
    pub success: bool,
    /// The root's newly computed content digest, in `options.algorithm`.
    pub content_hash: HashValue,
    /// The root's newly computed structure digest, in `options.algorithm`.
    pub structure_hash: HashValue,
    /// Reports for every nested root sealed as part of this operation.
    pub nested: Vec<SealReport>,
}

/// Seals `root`: resolves and seals nested roots first, verifies and hashes
/// every file, composes directory digests bottom-up, and appends a new
/// generation (§4.7).
#[tracing::instrument(skip(options, progress), fields(root = %root, algorithm = %options.algorithm))]
pub fn seal(
    root: &Utf8Path,
    options: &SealOptions,
    progress: &dyn ProgressSink,
) -> Result<SealReport, SealError> {
    check_cancelled(root, options)?;

    // Step 1: nested roots, depth-first, same algorithm.
    let ignore = IgnoreConfig::load(root)?;
    let nested_absolute = ManifestStore::locate_nested_roots(root)?;
    let mut nested_relative = HashSet::with_capacity(nested_absolute.len());
    for path in &nested_absolute {
        nested_relative.insert(relative_to(root, path));
    }

    tracing::debug!(count = nested_absolute.len(), "resolved nested roots");

    let mut nested_reports = Vec::with_capacity(nested_absolute.len());
    for nested_root in &nested_absolute {
        let _span = tracing::debug_span!("nested_root", path = %nested_root).entered();
        nested_reports.push(seal(nested_root, options, progress)?);
    }

    // Step 2: open the manifest store, build history.
    let store = ManifestStore::new(root);
    let _lock = store.lock()?;
    let documents = store.load_all()?;
    let history = HistoryIndex::build(&documents);
    let generation_number = documents.last().map_or(1, |d| d.generation_number + 1);
    let previous_generation = documents.last().map(|d| d.generation_number);
    let root_name = root
        .file_name()
        .map(str::to_owned)
        .unwrap_or_else(|| "root".to_string());

    check_cancelled(root, options)?;

    // Step 3: walk, hash, verify.
    let tree = walker::walk(root, &nested_relative, &ignore)?;
    let verify_results = hash_files_parallel(&tree, &history, options, progress)?;
    check_cancelled(root, options)?;

    let nested_by_path: HashMap<Utf8PathBuf, &SealReport> = nested_reports
        .iter()
        .map(|report| (relative_to(root, &report.root), report))
        .collect();

    let mut file_records = Vec::new();
    let mut directory_records = Vec::new();
    let mut child_histories = Vec::new();
    let root_folded = fold_dir(
        &tree,
        &verify_results,
        &nested_by_path,
        options.algorithm,
        progress,
        &mut file_records,
        &mut directory_records,
        &mut child_histories,
    );
    let root_content_hash = root_folded
        .content_hashes
        .get(&options.algorithm)
        .cloned()
        .ok_or_else(|| SealError::MissingRootDigest { root: root.to_owned() })?;
    let root_structure_hash = root_folded
        .structure_hashes
        .get(&options.algorithm)
        .cloned()
        .ok_or_else(|| SealError::MissingRootDigest { root: root.to_owned() })?;

    // Step 4: anything history knows about that the walk never saw on disk.
    let seen: HashSet<&Utf8Path> = file_records.iter().map(|f: &FileRecord| f.path.as_path()).collect();
    let mut missing = Vec::new();
    for path in history.all_known_paths() {
        if seen.contains(path.as_path()) || nested_by_path.contains_key(&path) {
            continue;
        }
        if let Some(last_present) = history.last_present_generation(&path) {
            progress.missing(&path);
            missing.push(MissingRecord {
                path,
                last_known_generation: last_present,
            });
        }
    }

    progress.root_hash(
        options.algorithm,
        &root_content_hash.encoded(),
        &root_structure_hash.encoded(),
    );

    // Step 5: compose the new generation document.
    let document = GenerationDocument {
        generation_number,
        previous_generation,
        created_at: Utc::now(),
        creator_host: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
        creator_user: whoami::username(),
        root_name,
        files: file_records,
        directories: directory_records,
        missing: missing.clone(),
        child_histories,
    };

    // Step 6: decide success before writing, since the document still gets
    // written either way.
    let success = document.is_clean();

    // Step 7: append atomically.
    let manifest_relative_path = store.append(&document)?;
    tracing::info!(generation = generation_number, success, "sealed generation");
    progress.new_generation(&manifest_relative_path);

    Ok(SealReport {
        root: root.to_owned(),
        generation_number,
        manifest_relative_path,
        success,
        content_hash: root_content_hash,
        structure_hash: root_structure_hash,
        nested: nested_reports,
    })
}

fn check_cancelled(root: &Utf8Path, options: &SealOptions) -> Result<(), SealError> {
    if options.cancel.load(Ordering::SeqCst) {
        return Err(SealError::Cancelled {
            path: root.to_owned(),
        });
    }
    Ok(())
}

fn relative_to(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_owned()
}

/// Runs the hashing stage across a bounded worker pool (§5): file reads are
/// the I/O-bound hot path, so they alone are parallelized. Digest
/// composition and manifest writes stay serial in the caller.
fn hash_files_parallel(
    tree: &WalkDir,
    history: &HistoryIndex,
    options: &SealOptions,
    progress: &dyn ProgressSink,
) -> Result<HashMap<Utf8PathBuf, VerifyResult>, SealError> {
    let files = walker::flatten_files(tree);
    let queue = Mutex::new(VecDeque::from(files));
    let results = Mutex::new(HashMap::new());
    let worker_count = options.worker_count.max(1);
    let error: Mutex<Option<SealError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                if options.cancel.load(Ordering::SeqCst) {
                    return;
                }
                let next: Option<WalkFile> = queue.lock().unwrap().pop_front();
                let Some(file) = next else {
                    return;
                };
                let _span = tracing::debug_span!("hash_file", path = %file.relative_path).entered();
                match verify::verify_file(
                    history,
                    &file.relative_path,
                    &file.absolute_path,
                    options.algorithm,
                ) {
                    Ok(result) => {
                        tracing::trace!(outcome = ?result.outcome, "verified");
                        report_file_progress(&file.relative_path, &result, progress);
                        results
                            .lock()
                            .unwrap()
                            .insert(file.relative_path, result);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to hash file");
                        *error.lock().unwrap() = Some(SealError::from(err));
                        return;
                    }
                }
            });
        }
    });

    if let Some(err) = error.into_inner().unwrap() {
        return Err(err);
    }
    Ok(results.into_inner().unwrap())
}

fn report_file_progress(path: &Utf8Path, result: &VerifyResult, progress: &dyn ProgressSink) {
    match &result.outcome {
        VerificationOutcome::NewFile => {
            if let Some((&algo, hash)) = result.observed_hashes.iter().next() {
                progress.created_original_hash(path, algo, &hash.encoded());
            }
        }
        VerificationOutcome::Verified => progress.verified(path),
        VerificationOutcome::VerifiedAndExtended => {
            progress.verified(path);
            for (&algo, hash) in &result.observed_hashes {
                progress.created_new_hash(path, algo, &hash.encoded());
            }
        }
        VerificationOutcome::HashMismatch { previous, observed } => {
            progress.hash_mismatch(path, previous.algorithm, &previous.encoded(), &observed.encoded());
        }
        VerificationOutcome::Missing | VerificationOutcome::UnsupportedEntry { .. } => {}
    }
}

/// What a just-folded directory or file contributes to its parent's digest
/// composition (§4.2).
struct ChildContribution {
    name: String,
    kind: ChildKind,
    content_hashes: BTreeMap<AlgorithmId, HashValue>,
    structure_hashes: BTreeMap<AlgorithmId, HashValue>,
}

/// A directory's digests, keyed by algorithm, as handed to its parent.
struct FoldedDir {
    content_hashes: BTreeMap<AlgorithmId, HashValue>,
    structure_hashes: BTreeMap<AlgorithmId, HashValue>,
}

/// Folds a walked directory tree bottom-up into file records, directory
/// records, and child-history records, pushing exactly one
/// [`DirectoryRecord`] per directory (including the root, at path `""`).
///
/// Directory digests are computed in every algorithm common to *all* of a
/// directory's immediate children (the intersection of their available
/// algorithm sets) so that a folder holding a freshly-extended file and a
/// brand-new file — which only shares the primary algorithm — still gets a
/// well-defined digest rather than one the seal partially fabricates.
#[allow(clippy::too_many_arguments)]
fn fold_dir(
    dir: &WalkDir,
    verify_results: &HashMap<Utf8PathBuf, VerifyResult>,
    nested_by_path: &HashMap<Utf8PathBuf, &SealReport>,
    primary_algorithm: AlgorithmId,
    progress: &dyn ProgressSink,
    file_records: &mut Vec<FileRecord>,
    directory_records: &mut Vec<DirectoryRecord>,
    child_histories: &mut Vec<ChildHistoryRecord>,
) -> FoldedDir {
    let mut contributions = Vec::with_capacity(dir.children.len());

    for child in &dir.children {
        match child {
            WalkChild::File(file) => {
                let Some(result) = verify_results.get(&file.relative_path) else {
                    continue;
                };
                file_records.push(FileRecord {
                    path: file.relative_path.clone(),
                    size: std::fs::metadata(&file.absolute_path).map(|m| m.len()).unwrap_or(0),
                    last_modified: std::fs::metadata(&file.absolute_path)
                        .ok()
                        .and_then(|m| m.modified().ok())
                        .map(chrono::DateTime::<Utc>::from),
                    hashes: result.observed_hashes.values().cloned().collect(),
                    outcome: result.outcome.clone(),
                });
                contributions.push(ChildContribution {
                    name: child_name(&file.relative_path),
                    kind: ChildKind::File,
                    content_hashes: result.observed_hashes.clone(),
                    structure_hashes: BTreeMap::new(),
                });
            }
            WalkChild::Directory(sub) => {
                let folded = fold_dir(
                    sub,
                    verify_results,
                    nested_by_path,
                    primary_algorithm,
                    progress,
                    file_records,
                    directory_records,
                    child_histories,
                );
                if let (Some(content), Some(structure)) = (
                    folded.content_hashes.get(&primary_algorithm),
                    folded.structure_hashes.get(&primary_algorithm),
                ) {
                    progress.directory_hash(
                        &sub.relative_path,
                        primary_algorithm,
                        &content.encoded(),
                        &structure.encoded(),
                    );
                }
                contributions.push(ChildContribution {
                    name: child_name(&sub.relative_path),
                    kind: ChildKind::Directory,
                    content_hashes: folded.content_hashes,
                    structure_hashes: folded.structure_hashes,
                });
            }
            WalkChild::NestedRoot(nested) => {
                let Some(report) = nested_by_path.get(&nested.relative_path) else {
                    continue;
                };
                child_histories.push(ChildHistoryRecord {
                    relative_path: nested.relative_path.clone(),
                    generation_number: report.generation_number,
                    root_content_hash: report.content_hash.clone(),
                    root_structure_hash: report.structure_hash.clone(),
                });
                let mut content_hashes = BTreeMap::new();
                content_hashes.insert(primary_algorithm, report.content_hash.clone());
                let mut structure_hashes = BTreeMap::new();
                structure_hashes.insert(primary_algorithm, report.structure_hash.clone());
                contributions.push(ChildContribution {
                    name: child_name(&nested.relative_path),
                    kind: ChildKind::Directory,
                    content_hashes,
                    structure_hashes,
                });
            }
            WalkChild::Unsupported(unsupported) => {
                progress.unsupported(&unsupported.relative_path, &unsupported.reason);
                file_records.push(FileRecord {
                    path: unsupported.relative_path.clone(),
                    size: 0,
                    last_modified: None,
                    hashes: Vec::new(),
                    outcome: VerificationOutcome::UnsupportedEntry {
                        reason: unsupported.reason.clone(),
                    },
                });
            }
        }
    }

    let algorithms = common_algorithms(&contributions, primary_algorithm);
    let mut content_digests = Vec::with_capacity(algorithms.len());
    let mut structure_digests = Vec::with_capacity(algorithms.len());
    let mut content_hashes = BTreeMap::new();
    let mut structure_hashes = BTreeMap::new();

    for algo in algorithms {
        let mut children: Vec<digest::Child<'_>> = contributions
            .iter()
            .map(|c| digest::Child {
                name: &c.name,
                kind: c.kind,
                content_hash: &c.content_hashes[&algo].bytes,
                structure_hash: c.structure_hashes.get(&algo).map(|h| h.bytes.as_slice()),
            })
            .collect();
        let pair = digest::compose(algo, &mut children);
        content_digests.push(pair.content.clone());
        structure_digests.push(pair.structure.clone());
        content_hashes.insert(algo, pair.content);
        structure_hashes.insert(algo, pair.structure);
    }

    directory_records.push(DirectoryRecord {
        path: dir.relative_path.clone(),
        content_digests,
        structure_digests,
    });

    FoldedDir {
        content_hashes,
        structure_hashes,
    }
}

/// The algorithms every child of a directory can supply a digest in:
/// always includes `primary_algorithm` (every child is hashed in it), plus
/// any algorithm common to every child's set.
fn common_algorithms(
    contributions: &[ChildContribution],
    primary_algorithm: AlgorithmId,
) -> Vec<AlgorithmId> {
    if contributions.is_empty() {
        return vec![primary_algorithm];
    }
    let mut common: HashSet<AlgorithmId> = contributions[0].content_hashes.keys().copied().collect();
    for contribution in &contributions[1..] {
        let keys: HashSet<AlgorithmId> = contribution.content_hashes.keys().copied().collect();
        common = common.intersection(&keys).copied().collect();
    }
    if common.is_empty() {
        vec![primary_algorithm]
    } else {
        let mut sorted: Vec<AlgorithmId> = common.into_iter().collect();
        sorted.sort_by_key(|a| a.as_str());
        sorted
    }
}

fn child_name(relative_path: &Utf8Path) -> String {
    relative_path
        .file_name()
        .unwrap_or(relative_path.as_str())
        .to_string()
}
