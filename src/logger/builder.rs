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

use std::sync::Arc;

use crate::Error;
use crate::append::Append;
use crate::logger::Logger;
use crate::logger::install;
use crate::logger::log_impl::Dispatch;
use crate::record::Level;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Create a new empty [`LoggerBuilder`] instance for configuring log dispatching.
///
/// # Examples
///
/// ```
/// use logforth_shared_file::append;
///
/// let builder = logforth_shared_file::builder()
///     .dispatch(|d| d.append(append::Stderr::default()))
///     .apply();
/// ```
pub fn builder() -> LoggerBuilder {
    LoggerBuilder {
        dispatches: vec![],
        worker: None,
        trap: Box::new(DefaultTrap::default()),
    }
}

/// A builder for configuring log dispatching and setting up the global logger.
///
/// # Examples
///
/// ```
/// use logforth_shared_file::append;
/// use logforth_shared_file::record::Level;
///
/// logforth_shared_file::builder()
///     .dispatch(|d| d.min_level(Level::Info).append(append::Stderr::default()))
///     .apply();
/// ```
#[must_use = "call `apply` to set the global logger or `build` to construct a logger instance"]
#[derive(Debug)]
pub struct LoggerBuilder {
    // stashed dispatches
    dispatches: Vec<Dispatch>,
    worker: Option<String>,
    trap: Box<dyn Trap>,
}

impl LoggerBuilder {
    /// Register a new dispatch with the [`LoggerBuilder`].
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatchBuilder<false>) -> DispatchBuilder<true>,
    {
        self.dispatches.push(f(DispatchBuilder::new()).build());
        self
    }

    /// Name the logical worker this process runs as.
    ///
    /// Records bridged from the `log` crate carry it, so that layouts can tell apart
    /// processes of the same application.
    pub fn worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Set the trap that receives append and flush errors.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`Logger`].
    pub fn build(self) -> Logger {
        Logger::new(self.dispatches, self.worker, self.trap)
    }

    /// Set up the global logger with all the configured dispatches.
    ///
    /// This should be called early in the execution of a Rust program. Any log events that occur
    /// before initialization will be ignored.
    ///
    /// # Errors
    ///
    /// Return an error if a global logger has already been set.
    pub fn try_apply(self) -> Result<(), Error> {
        install(Arc::new(self.build()))
    }

    /// Set up the global logger with all the configured dispatches.
    ///
    /// # Panics
    ///
    /// Panic if the global logger has already been set.
    pub fn apply(self) {
        self.try_apply()
            .expect("LoggerBuilder::apply must be called before the global logger initialized");
    }
}

/// A builder for configuring a log dispatch, including its level filter and appenders.
///
/// # Examples
///
/// ```
/// use logforth_shared_file::append;
/// use logforth_shared_file::record::Level;
///
/// logforth_shared_file::builder()
///     .dispatch(|d| {
///         d.min_level(Level::Debug)
///             .target_level("pika", Level::Warn)
///             .append(append::Stderr::default())
///     })
///     .apply();
/// ```
#[derive(Debug)]
pub struct DispatchBuilder<const APPEND: bool> {
    min_level: Level,
    targets: Vec<(String, Level)>,
    appends: Vec<Box<dyn Append>>,
}

impl DispatchBuilder<false> {
    fn new() -> Self {
        DispatchBuilder {
            min_level: Level::Trace,
            targets: vec![],
            appends: vec![],
        }
    }

    /// Set the least severe level this dispatch accepts. Defaults to [`Level::Trace`].
    pub fn min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Override the minimum level for a target and everything below it.
    ///
    /// The target `a.b` covers `a.b`, `a.b.c` and `a.b::c`. The longest matching target wins.
    pub fn target_level(mut self, target: impl Into<String>, level: Level) -> Self {
        self.targets.push((target.into(), level));
        self
    }
}

impl DispatchBuilder<true> {
    fn build(self) -> Dispatch {
        Dispatch::new(self.min_level, self.targets, self.appends)
    }
}

impl<const APPEND: bool> DispatchBuilder<APPEND> {
    /// Add an appender to this dispatch.
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> DispatchBuilder<true> {
        self.appends.push(append.into());
        DispatchBuilder {
            min_level: self.min_level,
            targets: self.targets,
            appends: self.appends,
        }
    }
}
