// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured, serializable access to ascmhl generation documents.
//!
//! This crate owns the concrete wire format that the sealing engine in
//! `ascmhl-core` reads and writes through its `ManifestStore` abstraction: a
//! JSON document per generation, plus the small set of value types (algorithm
//! ids, hash values, verification outcomes) shared between the engine and any
//! external tool that wants to parse a sealed root's history without linking
//! against the engine itself.

mod algorithm;
mod document;
mod exit_code;

pub use algorithm::{AlgorithmError, AlgorithmId, HashValue};
pub use document::{
    ChildHistoryRecord, DirectoryRecord, FileRecord, GenerationDocument, MissingRecord,
    VerificationOutcome,
};
pub use exit_code::SealExitCode;
