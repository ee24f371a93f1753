// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use fs2::FileExt;

use crate::Error;

/// The suffix appended to the log path to derive the path of its rotation lock.
pub const LOCK_SUFFIX: &str = "_rotating_lock";

/// Derive the lock path for a log path: `<path>_rotating_lock`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut lock_path = path.as_os_str().to_os_string();
    lock_path.push(LOCK_SUFFIX);
    PathBuf::from(lock_path)
}

/// An advisory lock that serializes rotation of one log path across processes.
///
/// Only processes that go through this lock are excluded from each other. The lock file itself
/// is created on first use and never deleted; only its lock state is contended.
#[derive(Debug)]
pub struct RotationLock;

impl RotationLock {
    /// Try to take the lock without waiting.
    ///
    /// Returns `Ok(None)` if another process (or another open handle in this process) holds the
    /// lock. That is a normal outcome, not an error.
    pub fn try_acquire(lock_path: impl AsRef<Path>) -> Result<Option<RotationLockGuard>, Error> {
        let lock_path = lock_path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|err| {
                Error::new("failed to open rotation lock")
                    .with_path(lock_path)
                    .with_source(err)
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(RotationLockGuard {
                file,
                path: lock_path.to_path_buf(),
            })),
            Err(err) if is_contended(&err) => Ok(None),
            Err(err) => Err(Error::new("failed to take rotation lock")
                .with_path(lock_path)
                .with_source(err)),
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// A held rotation lock. The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct RotationLockGuard {
    file: File,
    path: PathBuf,
}

impl RotationLockGuard {
    /// The path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RotationLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
