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

//! Appender for writing log records to a time-rotated file shared by many processes.
//!
//! Any number of processes may point a [`SharedFile`] at the same path. Each of them checks,
//! before every write, whether the file it holds open is still the one at the path, and follows
//! a rotation done elsewhere by reopening. When the scheduled rollover instant passes, the
//! first process to take the non-blocking `<path>_rotating_lock` lock renames the file to
//! `<path>.<suffix>`, where the suffix names the start of the interval that just ended. A
//! process that finds the lock taken just keeps writing; no record is ever dropped because of
//! rotation.
//!
//! # Example
//!
//!```
//! use logforth_shared_file::append::shared_file::SharedFile;
//! use logforth_shared_file::append::shared_file::SharedFileWriter;
//! use logforth_shared_file::append::shared_file::When;
//! use logforth_shared_file::layout::TextLayout;
//! use logforth_shared_file::record::Level;
//!
//! let writer = SharedFileWriter::builder()
//!     .when(When::Midnight)
//!     .backup_count(7)
//!     .build("logs/billing.log")
//!     .unwrap();
//!
//! logforth_shared_file::builder()
//!     .dispatch(|d| {
//!         d.min_level(Level::Info)
//!             .append(SharedFile::new(writer).with_layout(TextLayout::new("billing")))
//!     })
//!     .apply();
//!
//! log::info!("This log will be written to a shared file.");
//! ```

pub use self::append::SharedFile;
pub use self::identity::FileIdentity;
pub use self::lock::RotationLock;
pub use self::lock::RotationLockGuard;
pub use self::lock::lock_path;
pub use self::schedule::RotationScheduler;
pub use self::schedule::When;
pub use self::writer::SharedFileWriter;
pub use self::writer::SharedFileWriterBuilder;

mod append;
mod clock;
mod identity;
mod lock;
mod schedule;
mod writer;
