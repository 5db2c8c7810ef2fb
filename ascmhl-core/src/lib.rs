// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sealing engine: hashing, directory digest composition, the manifest
//! store, history replay, the directory walker, per-file verification, and
//! the orchestrator that drives one seal end to end.
//!
//! This crate has no CLI or progress-rendering concerns of its own; the
//! `ascmhl` binary drives it through [`seal`] and a concrete
//! [`ProgressSink`].

pub mod digest;
pub mod errors;
pub mod hash;
pub mod history;
pub mod path;
pub mod progress;
pub mod store;
pub mod verify;
pub mod walker;

mod orchestrator;

pub use errors::{HashError, SealError, StoreError, WalkError};
pub use history::HistoryIndex;
pub use orchestrator::{seal, SealOptions, SealReport};
pub use progress::{NoopProgressSink, ProgressSink};
pub use store::{ManifestStore, STORE_DIR_NAME};
pub use verify::VerifyResult;
