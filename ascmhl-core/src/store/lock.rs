// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory locking for a manifest store directory (§5), preventing two
//! concurrent seals of the same root. Grounded on the teacher's
//! `record/store.rs::acquire_lock_with_retry`.

use crate::errors::StoreError;
use camino::Utf8Path;
use std::fs::{File, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_FILE_NAME: &str = ".ascmhl.lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusive, advisory lock on a manifest store, held for the lifetime of
/// this value. Released automatically on drop.
#[derive(Debug)]
pub struct ManifestStoreLock<'store> {
    _file: File,
    _marker: std::marker::PhantomData<&'store ()>,
}

impl<'store> ManifestStoreLock<'store> {
    pub(super) fn acquire(store_dir: &Utf8Path) -> Result<Self, StoreError> {
        let lock_path = store_dir.join(LOCK_FILE_NAME);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| StoreError::Lock {
                path: lock_path.clone(),
                source,
            })?;

        let start = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => {
                    return Ok(Self {
                        _file: file,
                        _marker: std::marker::PhantomData,
                    });
                }
                Err(TryLockError::WouldBlock) => {
                    if start.elapsed() >= LOCK_TIMEOUT {
                        return Err(StoreError::LockTimeout {
                            path: lock_path,
                            timeout_secs: LOCK_TIMEOUT.as_secs(),
                        });
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(TryLockError::Error(source)) => {
                    return Err(StoreError::Lock {
                        path: lock_path,
                        source,
                    });
                }
            }
        }
    }
}
