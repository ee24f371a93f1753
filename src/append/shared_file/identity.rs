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

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;

/// The (device, inode) pair of a file.
///
/// Two paths with the same identity name the same file. The shared file writer caches the
/// identity of the file it has open and compares it against the identity of whatever the log
/// path currently names, to notice that another process (or an external log rotation tool)
/// has moved the file away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Stat the file the path currently names.
    ///
    /// The path is stat'ed rather than any open handle, so a rename or removal done by another
    /// process is visible even though the caller still holds a descriptor to the old inode.
    ///
    /// Returns `Ok(None)` if nothing exists at the path.
    pub fn of_path(path: impl AsRef<Path>) -> io::Result<Option<FileIdentity>> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Some(FileIdentity::from_metadata(&metadata))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The identity of an open file handle.
    pub fn of_file(file: &File) -> io::Result<FileIdentity> {
        let metadata = file.metadata()?;
        Ok(FileIdentity::from_metadata(&metadata))
    }

    #[cfg(unix)]
    fn from_metadata(metadata: &fs::Metadata) -> FileIdentity {
        use std::os::unix::fs::MetadataExt;

        FileIdentity {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    // Windows has no stable file index; a rename keeps the creation time and a new file gets
    // a fresh one.
    #[cfg(windows)]
    fn from_metadata(metadata: &fs::Metadata) -> FileIdentity {
        use std::os::windows::fs::MetadataExt;

        FileIdentity {
            dev: 0,
            ino: metadata.creation_time(),
        }
    }

    #[cfg(not(any(unix, windows)))]
    fn from_metadata(metadata: &fs::Metadata) -> FileIdentity {
        let created = metadata
            .created()
            .ok()
            .and_then(|created| created.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |since| since.as_nanos() as u64);

        FileIdentity {
            dev: 0,
            ino: created,
        }
    }

    /// The device number. Always `0` off unix.
    pub fn dev(&self) -> u64 {
        self.dev
    }

    /// The inode number, or the creation time off unix.
    pub fn ino(&self) -> u64 {
        self.ino
    }

    /// Whether the cached identity still names the file found at the path.
    ///
    /// A missing file never matches.
    pub fn matches(cached: Option<FileIdentity>, current: Option<FileIdentity>) -> bool {
        match (cached, current) {
            (Some(cached), Some(current)) => cached == current,
            _ => false,
        }
    }
}
