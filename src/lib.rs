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

//! A logging backend whose centerpiece is a time-rotated log file that any number of
//! processes can share.
//!
//! # Overview
//!
//! Processes of one application usually log to the same file. The
//! [`SharedFile`](append::SharedFile) appender makes that safe: each process notices when the
//! file has been rotated away by another process and reopens it, and rotation itself is
//! guarded by a non-blocking cross-process lock so that exactly one process rotates each
//! interval. Around it sit a console appender, an [`Escalation`](append::Escalation) appender
//! that mails critical records to operators, and a logger bridged to the `log` crate.
//!
//! # Examples
//!
//! ```
//! use logforth_shared_file::append;
//! use logforth_shared_file::record::Level;
//!
//! logforth_shared_file::builder()
//!     .dispatch(|d| d.min_level(Level::Info).append(append::Stderr::default()))
//!     .apply();
//!
//! log::info!("This is an info message.");
//! ```
//!
//! Build the whole stack from settings:
//!
//! ```
//! use logforth_shared_file::Lifecycle;
//! use logforth_shared_file::config::HandlerContext;
//! use logforth_shared_file::config::LoggingSettings;
//! use logforth_shared_file::config::Registry;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let settings = LoggingSettings {
//!     app_name: "billing".to_string(),
//!     log_dir: dir.path().to_path_buf(),
//!     ..LoggingSettings::default()
//! };
//!
//! let logger = Registry::new()
//!     .build_logger(&settings, &HandlerContext::default(), &settings.handler_keys())
//!     .unwrap();
//!
//! let mut lifecycle = Lifecycle::new();
//! lifecycle.initialize(logger).unwrap();
//! lifecycle.install().unwrap();
//!
//! log::info!("written to {}", settings.log_file().display());
//! lifecycle.shutdown();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod config;
pub mod layout;
pub mod record;
pub mod trap;

mod error;
pub use self::error::Error;

mod lifecycle;
pub use self::lifecycle::Lifecycle;

mod logger;
pub use self::logger::CRITICAL_KEY;
pub use self::logger::DispatchBuilder;
pub use self::logger::Logger;
pub use self::logger::LoggerBuilder;
pub use self::logger::builder;
