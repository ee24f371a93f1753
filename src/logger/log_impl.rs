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

use std::cell::Cell;
use std::sync::Arc;

use crate::Error;
use crate::append::Append;
use crate::record::Level;
use crate::record::Record;
use crate::trap::Trap;

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

// Marks the current thread as dispatching until dropped.
struct DispatchingGuard;

impl DispatchingGuard {
    fn enter() -> Option<DispatchingGuard> {
        if DISPATCHING.with(|d| d.replace(true)) {
            None
        } else {
            Some(DispatchingGuard)
        }
    }
}

impl Drop for DispatchingGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(false));
    }
}

/// A logger that dispatches log records to one or more dispatches.
///
/// This struct implements [`log::Log`] to bridge the `log` crate macros to the appenders.
///
/// A record emitted while another record is being dispatched on the same thread, for example by
/// an appender reporting on its own work, is dropped. Appenders may therefore log freely
/// without dead-locking on their own state.
#[derive(Debug)]
pub struct Logger {
    dispatches: Vec<Dispatch>,
    worker: Option<String>,
    trap: Box<dyn Trap>,
}

impl Logger {
    pub(super) fn new(
        dispatches: Vec<Dispatch>,
        worker: Option<String>,
        trap: Box<dyn Trap>,
    ) -> Self {
        Self {
            dispatches,
            worker,
            trap,
        }
    }

    /// Whether any dispatch accepts records of the given target and level.
    pub fn enabled(&self, target: &str, level: Level) -> bool {
        self.dispatches
            .iter()
            .any(|dispatch| dispatch.enabled(target, level))
    }

    /// Dispatch a log record to every dispatch that accepts it.
    ///
    /// Append errors are handed to the trap.
    pub fn log(&self, record: &Record) {
        let Some(_guard) = DispatchingGuard::enter() else {
            return;
        };
        self.dispatch(record);
    }

    fn dispatch(&self, record: &Record) {
        for dispatch in &self.dispatches {
            if let Err(err) = dispatch.log(record) {
                let err = Error::new("failed to append record")
                    .with_context("target", record.target())
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
    }

    /// Flush every appender. Flush errors are handed to the trap.
    pub fn flush(&self) {
        for dispatch in &self.dispatches {
            for err in dispatch.flush() {
                let err = Error::new("failed to flush appender").with_source(err);
                self.trap.trap(&err);
            }
        }
    }

    /// The most verbose level any dispatch accepts, as a `log` crate filter.
    pub fn max_level(&self) -> log::LevelFilter {
        match self.dispatches.iter().map(Dispatch::most_verbose).min() {
            None => log::LevelFilter::Off,
            Some(Level::Trace) => log::LevelFilter::Trace,
            Some(Level::Debug) => log::LevelFilter::Debug,
            Some(Level::Info) => log::LevelFilter::Info,
            Some(Level::Warn) => log::LevelFilter::Warn,
            Some(Level::Error) | Some(Level::Crit) => log::LevelFilter::Error,
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Logger::enabled(self, metadata.target(), metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let Some(_guard) = DispatchingGuard::enter() else {
            return;
        };

        let level = bridged_level(record);
        if !Logger::enabled(self, record.target(), level) {
            return;
        }

        let mut builder = Record::builder()
            .level(level)
            .target(record.target().to_string())
            .payload(record.args().to_string());
        if let Some(worker) = &self.worker {
            builder = builder.worker(worker.clone());
        }
        self.dispatch(&builder.build());
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

/// The key that raises a record of the `log` crate to [`Level::Crit`].
///
/// The `log` crate has no level above `Error`; a record carrying `critical = true` is
/// dispatched as critical whatever its `log` level:
///
/// ```
/// log::error!(target: "billing.db", critical = true; "database is gone");
/// ```
pub const CRITICAL_KEY: &str = "critical";

fn bridged_level(record: &log::Record) -> Level {
    let key = log::kv::Key::from_str(CRITICAL_KEY);
    let critical = log::kv::Source::get(record.key_values(), key)
        .and_then(|value| value.to_bool())
        .unwrap_or(false);
    if critical {
        Level::Crit
    } else {
        Level::from(record.level())
    }
}

// Forwards the global `log` logger to a logger that is still owned elsewhere.
struct GlobalLogger(Arc<Logger>);

impl log::Log for GlobalLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        log::Log::enabled(self.0.as_ref(), metadata)
    }

    fn log(&self, record: &log::Record) {
        log::Log::log(self.0.as_ref(), record)
    }

    fn flush(&self) {
        self.0.flush()
    }
}

/// Set the logger as the global `log` logger.
pub(crate) fn install(logger: Arc<Logger>) -> Result<(), Error> {
    let max_level = logger.max_level();
    log::set_boxed_logger(Box::new(GlobalLogger(logger))).map_err(|err| {
        Error::new("global logger has already been set").with_source(err)
    })?;
    log::set_max_level(max_level);
    Ok(())
}

/// A grouped set of appenders with a level filter.
///
/// A record passes the filter when its level is at least the level configured for the longest
/// matching target prefix, or the dispatch minimum if no target prefix matches.
#[derive(Debug)]
pub(super) struct Dispatch {
    min_level: Level,
    targets: Vec<(String, Level)>,
    appends: Vec<Box<dyn Append>>,
}

impl Dispatch {
    pub(super) fn new(
        min_level: Level,
        targets: Vec<(String, Level)>,
        appends: Vec<Box<dyn Append>>,
    ) -> Self {
        debug_assert!(
            !appends.is_empty(),
            "A Dispatch must have at least one append"
        );

        Self {
            min_level,
            targets,
            appends,
        }
    }

    fn threshold(&self, target: &str) -> Level {
        self.targets
            .iter()
            .filter(|(prefix, _)| target_matches(prefix, target))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.min_level, |(_, level)| *level)
    }

    fn most_verbose(&self) -> Level {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.min_level, Level::min)
    }

    fn enabled(&self, target: &str, level: Level) -> bool {
        level >= self.threshold(target)
    }

    fn log(&self, record: &Record) -> Result<(), Error> {
        if !self.enabled(record.target(), record.level()) {
            return Ok(());
        }

        for append in &self.appends {
            append.append(record)?;
        }
        Ok(())
    }

    fn flush(&self) -> Vec<Error> {
        self.appends
            .iter()
            .filter_map(|append| append.flush().err())
            .collect()
    }
}

// `a.b` covers `a.b`, `a.b.c` and `a.b::c`.
fn target_matches(prefix: &str, target: &str) -> bool {
    match target.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with("::"),
        None => false,
    }
}
