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

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::append::shared_file::When;
use crate::append::shared_file::clock::Clock;
use crate::append::shared_file::identity::FileIdentity;
use crate::append::shared_file::lock::RotationLock;
use crate::append::shared_file::lock::lock_path;
use crate::append::shared_file::schedule::RotationScheduler;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A writer for a log file shared by many processes, rotated on a time schedule.
///
/// Every process that logs to the same path runs its own writer. Before each write the
/// writer checks that its open handle still names the file at the path, and reopens if
/// another process has rotated it away. When a rollover is due, only the process that wins
/// the non-blocking rotation lock rotates; the others keep writing and try again on their
/// next write.
#[derive(Debug)]
pub struct SharedFileWriter {
    state: State,
    stream: Option<File>,
}

impl SharedFileWriter {
    /// Creates a new [`SharedFileWriterBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_shared_file::append::shared_file::SharedFileWriter;
    ///
    /// let builder = SharedFileWriter::builder();
    /// ```
    #[must_use]
    pub fn builder() -> SharedFileWriterBuilder {
        SharedFileWriterBuilder::new()
    }

    /// The base path records are written to.
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    /// The next instant a rotation is due, once the file has been opened.
    pub fn rollover_at(&self) -> Option<Timestamp> {
        self.state.rollover_at
    }

    /// How many due rotations were skipped because another process held the lock.
    ///
    /// Each skip is also logged at debug level through the `log` crate. When this writer runs
    /// inside the crate's own [`Logger`](crate::Logger), that record is emitted while a
    /// dispatch is in progress and is dropped, so this counter is the place to look.
    pub fn skipped_rotations(&self) -> u64 {
        self.state.skipped_rotations
    }

    fn write_record(&mut self, buf: &[u8]) -> Result<(), Error> {
        let now = self.state.clock.now();

        if self.stream.is_none() {
            self.open_initial(now)?;
        }
        self.revalidate(now)?;

        if self.state.should_rollover(now) {
            self.try_rollover(now);
        }

        if self.stream.is_none() {
            self.state.open(&mut self.stream)?;
        }
        match self.stream.as_mut() {
            Some(stream) => stream.write_all(buf).map_err(|err| {
                Error::new("failed to write log file")
                    .with_path(&self.state.path)
                    .with_source(err)
            }),
            None => Err(Error::new("log file is not open").with_path(&self.state.path)),
        }
    }

    fn open_initial(&mut self, now: Timestamp) -> Result<(), Error> {
        if self.state.rollover_at.is_none() {
            self.state.schedule_from_file(now);
        }
        self.state.open(&mut self.stream)
    }

    // The path is stat'ed before every write; a missing or different file means another
    // process has rotated it, or something outside removed it. Either way the schedule this
    // writer kept belongs to a file that is gone, so it restarts from the new one.
    fn revalidate(&mut self, now: Timestamp) -> Result<(), Error> {
        let path = &self.state.path;
        let current = FileIdentity::of_path(path).map_err(|err| {
            Error::new("failed to stat log file")
                .with_path(path)
                .with_source(err)
        })?;

        if !FileIdentity::matches(self.state.identity, current) {
            log::debug!("log file {} was replaced, reopening", path.display());
            self.state.close(&mut self.stream);
            self.state.schedule_from_file(now);
            self.state.open(&mut self.stream)?;
        }
        Ok(())
    }

    fn try_rollover(&mut self, now: Timestamp) {
        let guard = match RotationLock::try_acquire(&self.state.lock_path) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                self.state.skipped_rotations += 1;
                log::debug!(
                    "rotation of {} is in progress elsewhere, skipped",
                    self.state.path.display()
                );
                return;
            }
            Err(err) => {
                self.state.trap.trap(&err);
                return;
            }
        };

        if let Err(err) = self.rollover(now) {
            self.state.trap.trap(&err);
        }
        drop(guard);
    }

    // Runs only while holding the rotation lock.
    fn rollover(&mut self, now: Timestamp) -> Result<(), Error> {
        let rollover_at = self.state.rollover_at.unwrap_or(now);
        let path = self.state.path.clone();

        // the file this writer was writing to, before the lock was taken
        let expected = self.state.identity;
        self.state.close(&mut self.stream);

        let suffix = self.state.scheduler.archive_suffix(rollover_at);
        let archive = archive_path(&path, &suffix);
        let current = FileIdentity::of_path(&path).map_err(|err| {
            Error::new("failed to stat log file")
                .with_path(&path)
                .with_source(err)
        })?;

        // A different file at the path means a concurrent process rotated in between; it
        // belongs to a later interval and must not take this interval's name. An existing
        // archive means this interval was already rotated.
        if !FileIdentity::matches(expected, current) {
            log::debug!("{} was rotated elsewhere, not archiving", path.display());
        } else if !exists(&archive)? {
            match fs::rename(&path, &archive) {
                Ok(()) => log::debug!("rotated {} to {}", path.display(), archive.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(Error::new("failed to archive log file")
                        .with_path(&path)
                        .with_context("archive", archive.display())
                        .with_source(err));
                }
            }
        }

        if self.state.backup_count > 0 {
            self.state.prune();
        }

        self.state.open(&mut self.stream)?;
        let next = self.state.scheduler.next_rollover(Some(rollover_at), now);
        self.state.rollover_at = Some(next);
        Ok(())
    }
}

impl Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_record(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

/// A builder for configuring [`SharedFileWriter`].
#[derive(Debug)]
pub struct SharedFileWriterBuilder {
    when: When,
    utc: bool,
    timezone: Option<TimeZone>,
    backup_count: usize,
    trap: Box<dyn Trap>,
    clock: Clock,
}

impl Default for SharedFileWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedFileWriterBuilder {
    /// Creates a new [`SharedFileWriterBuilder`].
    ///
    /// Defaults to rotating every midnight of the local time zone and keeping every archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            when: When::Midnight,
            utc: false,
            timezone: None,
            backup_count: 0,
            trap: Box::new(DefaultTrap::default()),
            clock: Clock::DefaultClock,
        }
    }

    /// Sets the time unit to rotate on.
    #[must_use]
    pub fn when(mut self, when: When) -> Self {
        self.when = when;
        self
    }

    /// Computes boundaries and archive names in UTC instead of local time.
    #[must_use]
    pub fn utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    /// Sets the local time zone. Defaults to the system time zone.
    #[must_use]
    pub fn timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Sets how many archives to keep. `0` keeps all of them.
    #[must_use]
    pub fn backup_count(mut self, n: usize) -> Self {
        self.backup_count = n;
        self
    }

    /// Sets the trap that receives rotation errors.
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`SharedFileWriter`].
    ///
    /// The file is not opened until the first write.
    pub fn build(self, path: impl AsRef<Path>) -> Result<SharedFileWriter, Error> {
        let Self {
            when,
            utc,
            timezone,
            backup_count,
            trap,
            clock,
        } = self;

        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(Error::new("log path does not name a file").with_path(&path));
        }

        let mut scheduler = RotationScheduler::new(when, utc);
        if let Some(timezone) = timezone {
            scheduler = scheduler.with_timezone(timezone);
        }

        let state = State {
            lock_path: lock_path(&path),
            path,
            scheduler,
            backup_count,
            identity: None,
            rollover_at: None,
            skipped_rotations: 0,
            clock,
            trap,
        };
        Ok(SharedFileWriter {
            state,
            stream: None,
        })
    }
}

#[derive(Debug)]
struct State {
    path: PathBuf,
    lock_path: PathBuf,
    scheduler: RotationScheduler,
    backup_count: usize,
    identity: Option<FileIdentity>,
    rollover_at: Option<Timestamp>,
    skipped_rotations: u64,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl State {
    // A file modified in an earlier interval is due at once; the clock wins over a
    // modification time in the future.
    fn schedule_from_file(&mut self, now: Timestamp) {
        let base_time = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => Timestamp::try_from(modified).map_or(now, |modified| modified.min(now)),
            Err(_) => now,
        };
        self.rollover_at = Some(self.scheduler.initial_rollover(base_time));
    }

    fn should_rollover(&self, now: Timestamp) -> bool {
        self.rollover_at.is_some_and(|at| now >= at)
    }

    fn open(&mut self, stream: &mut Option<File>) -> Result<(), Error> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_path(dir)
                    .with_source(err)
            })?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|err| {
                Error::new("failed to open log file")
                    .with_path(&self.path)
                    .with_source(err)
            })?;
        let identity = FileIdentity::of_file(&file).map_err(|err| {
            Error::new("failed to stat log file")
                .with_path(&self.path)
                .with_source(err)
        })?;

        self.identity = Some(identity);
        *stream = Some(file);
        Ok(())
    }

    fn close(&mut self, stream: &mut Option<File>) {
        if let Some(mut file) = stream.take() {
            if let Err(err) = file.flush() {
                let err = Error::new("failed to flush log file")
                    .with_path(&self.path)
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
        self.identity = None;
    }

    // Every failure is isolated to its own file.
    fn prune(&self) {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let Some(base_name) = self.path.file_name().and_then(|name| name.to_str()) else {
            return;
        };
        let prefix = format!("{base_name}.");

        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                let err = Error::new("failed to list log directory")
                    .with_path(dir)
                    .with_source(err);
                self.trap.trap(&err);
                return;
            }
        };

        let mut archives = read_dir
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let filename = entry.file_name().into_string().ok()?;
                let suffix = filename.strip_prefix(&prefix)?;
                self.scheduler
                    .matches_suffix(suffix)
                    .then(|| dir.join(&filename))
            })
            .collect::<Vec<_>>();

        if archives.len() <= self.backup_count {
            return;
        }

        // suffixes sort chronologically
        archives.sort();
        let excess = archives.len() - self.backup_count;
        for archive in archives.iter().take(excess) {
            match fs::remove_file(archive) {
                Ok(()) => log::debug!("removed expired log archive {}", archive.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    let err = Error::new("failed to remove expired log archive")
                        .with_path(archive)
                        .with_source(err);
                    self.trap.trap(&err);
                }
            }
        }
    }
}

fn archive_path(path: &Path, suffix: &str) -> PathBuf {
    let mut archive = OsString::from(path.as_os_str());
    archive.push(".");
    archive.push(suffix);
    PathBuf::from(archive)
}

fn exists(path: &Path) -> Result<bool, Error> {
    path.try_exists().map_err(|err| {
        Error::new("failed to stat log file")
            .with_path(path)
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::time::SystemTime;

    use jiff::Span;
    use jiff::Timestamp;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;
    use crate::append::shared_file::clock::ManualClock;
    use crate::trap::testing::RecordingTrap;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn writer_at(when: When, start: Timestamp) -> SharedFileWriterBuilder {
        SharedFileWriterBuilder::new()
            .when(when)
            .utc(true)
            .clock(Clock::ManualClock(ManualClock::new(start)))
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn generate_random_string() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect()
    }

    #[test]
    fn test_one_archive_per_interval() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let start = ts("2024-08-10T00:00:00Z");
        let mut writer = writer_at(When::Minutes, start).build(&path).unwrap();

        let mut now = start;
        for i in 0..30 {
            writer.state.clock.set_now(now);
            let line = format!("{i} {}\n", generate_random_string());
            assert_eq!(writer.write(line.as_bytes()).unwrap(), line.len());
            now = now.checked_add(Span::new().seconds(10)).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app.log",
                "app.log.2024-08-10_00-00",
                "app.log.2024-08-10_00-01",
                "app.log.2024-08-10_00-02",
                "app.log.2024-08-10_00-03",
                "app.log_rotating_lock",
            ]
        );

        for (minute, archive) in ["00-00", "00-01", "00-02", "00-03"].iter().enumerate() {
            let lines = read_lines(&temp_dir.path().join(format!("app.log.2024-08-10_{archive}")));
            assert_eq!(lines.len(), 6);
            assert!(lines[0].starts_with(&format!("{} ", minute * 6)));
        }

        // the base file holds only what was written after the last rotation
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("24 "));
        assert_eq!(writer.rollover_at(), Some(ts("2024-08-10T00:05:00Z")));
    }

    #[test]
    fn test_missed_intervals_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let start = ts("2024-08-10T00:00:00Z");
        let mut writer = writer_at(When::Minutes, start).build(&path).unwrap();

        writer.write_all(b"first\n").unwrap();

        writer.state.clock.set_now(ts("2024-08-10T00:03:30Z"));
        writer.write_all(b"second\n").unwrap();
        assert_eq!(writer.rollover_at(), Some(ts("2024-08-10T00:04:00Z")));

        writer.state.clock.set_now(ts("2024-08-10T00:04:10Z"));
        writer.write_all(b"third\n").unwrap();

        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app.log",
                "app.log.2024-08-10_00-00",
                "app.log.2024-08-10_00-03",
                "app.log_rotating_lock",
            ]
        );
        assert_eq!(read_lines(&path), vec!["third"]);
    }

    #[test]
    fn test_lock_contention_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let start = ts("2024-08-10T00:00:00Z");
        let mut writer = writer_at(When::Minutes, start).build(&path).unwrap();

        writer.write_all(b"before\n").unwrap();

        // a competing process is rotating right now
        let guard = RotationLock::try_acquire(lock_path(&path)).unwrap().unwrap();
        writer.state.clock.set_now(ts("2024-08-10T00:01:05Z"));
        writer.write_all(b"contended\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.skipped_rotations(), 1);
        assert_eq!(read_lines(&path), vec!["before", "contended"]);
        assert!(!temp_dir.path().join("app.log.2024-08-10_00-00").exists());

        drop(guard);
        writer.state.clock.set_now(ts("2024-08-10T00:01:10Z"));
        writer.write_all(b"after\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            read_lines(&temp_dir.path().join("app.log.2024-08-10_00-00")),
            vec!["before", "contended"]
        );
        assert_eq!(read_lines(&path), vec!["after"]);
    }

    #[test]
    fn test_reopen_after_external_rename() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let moved = temp_dir.path().join("app.log.moved");
        let mut writer = writer_at(When::Day, ts("2024-08-10T00:00:00Z"))
            .build(&path)
            .unwrap();

        writer.write_all(b"one\n").unwrap();
        fs::rename(&path, &moved).unwrap();
        writer.write_all(b"two\n").unwrap();

        fs::remove_file(&path).unwrap();
        writer.write_all(b"three\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(read_lines(&moved), vec!["one"]);
        assert_eq!(read_lines(&path), vec!["three"]);
        // no rotation was due, so nothing ever took the lock
        assert!(!lock_path(&path).exists());
    }

    #[test]
    fn test_backup_count_prunes_oldest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let start = ts("2024-08-10T00:00:00Z");
        let mut writer = writer_at(When::Seconds, start)
            .backup_count(3)
            .build(&path)
            .unwrap();

        // neither of these has the shape of an archive
        fs::write(temp_dir.path().join("app.log.keep"), b"").unwrap();
        fs::write(temp_dir.path().join("other.log.2024-08-09_00-00-00"), b"").unwrap();

        // 3 + 4 rotations
        let mut now = start;
        for i in 0..8 {
            writer.state.clock.set_now(now);
            writer.write_all(format!("{i}\n").as_bytes()).unwrap();
            now = now.checked_add(Span::new().seconds(1)).unwrap();
        }

        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app.log",
                "app.log.2024-08-10_00-00-04",
                "app.log.2024-08-10_00-00-05",
                "app.log.2024-08-10_00-00-06",
                "app.log.keep",
                "app.log_rotating_lock",
                "other.log.2024-08-09_00-00-00",
            ]
        );
    }

    #[test]
    fn test_failed_prune_keeps_pruning_others() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let trap = RecordingTrap::default();
        let mut writer = writer_at(When::Seconds, ts("2024-08-10T00:00:00Z"))
            .backup_count(1)
            .trap(trap.clone())
            .build(&path)
            .unwrap();

        // the oldest excess archive cannot be removed with remove_file
        let stuck = temp_dir.path().join("app.log.2024-08-09_23-59-58");
        fs::create_dir(&stuck).unwrap();
        fs::write(stuck.join("inner"), b"").unwrap();
        fs::write(temp_dir.path().join("app.log.2024-08-09_23-59-59"), b"old\n").unwrap();

        writer.write_all(b"0\n").unwrap();
        writer.state.clock.set_now(ts("2024-08-10T00:00:01Z"));
        writer.write_all(b"1\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app.log",
                "app.log.2024-08-09_23-59-58",
                "app.log.2024-08-10_00-00-00",
                "app.log_rotating_lock",
            ]
        );
        let caught = trap.caught();
        assert_eq!(caught.len(), 1);
        assert!(caught[0].starts_with("failed to remove expired log archive"));
        assert_eq!(
            read_lines(&temp_dir.path().join("app.log.2024-08-10_00-00-00")),
            vec!["0"]
        );
        assert_eq!(read_lines(&path), vec!["1"]);
    }

    // Two writers on one path play the part of two processes.
    #[test]
    fn test_stale_writer_keeps_newer_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let start = ts("2024-08-10T00:00:00Z");
        let build = || {
            writer_at(When::Minutes, start)
                .backup_count(1)
                .build(&path)
                .unwrap()
        };
        let mut first = build();
        let mut second = build();

        first.write_all(b"a0\n").unwrap();
        second.write_all(b"b0\n").unwrap();

        // the first writer rotates twice, pruning the archive of 00:00
        first.state.clock.set_now(ts("2024-08-10T00:01:05Z"));
        first.write_all(b"a1\n").unwrap();
        first.state.clock.set_now(ts("2024-08-10T00:02:05Z"));
        first.write_all(b"a2\n").unwrap();
        first.flush().unwrap();

        // the second writer is still scheduled for 00:01
        second.state.clock.set_now(ts("2024-08-10T00:02:10Z"));
        second.write_all(b"b2\n").unwrap();
        second.flush().unwrap();

        assert_eq!(
            file_names(temp_dir.path()),
            vec!["app.log", "app.log.2024-08-10_00-01", "app.log_rotating_lock"]
        );
        assert_eq!(
            read_lines(&temp_dir.path().join("app.log.2024-08-10_00-01")),
            vec!["a1"]
        );
        assert_eq!(read_lines(&path), vec!["a2", "b2"]);
        assert_eq!(second.rollover_at(), Some(ts("2024-08-10T00:03:00Z")));
        assert_eq!(second.skipped_rotations(), 0);
    }

    #[test]
    fn test_existing_archive_is_never_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let archive = temp_dir.path().join("app.log.2024-08-10_00-00");
        let mut writer = writer_at(When::Minutes, ts("2024-08-10T00:00:00Z"))
            .build(&path)
            .unwrap();

        writer.write_all(b"mine\n").unwrap();
        fs::write(&archive, b"rotated elsewhere\n").unwrap();

        writer.state.clock.set_now(ts("2024-08-10T00:01:00Z"));
        writer.write_all(b"still mine\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(read_lines(&archive), vec!["rotated elsewhere"]);
        assert_eq!(read_lines(&path), vec!["mine", "still mine"]);
        assert_eq!(writer.rollover_at(), Some(ts("2024-08-10T00:02:00Z")));
    }

    #[test]
    fn test_check_not_due_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut writer = writer_at(When::Hours, ts("2024-08-10T00:00:00Z"))
            .build(&path)
            .unwrap();
        assert!(file_names(temp_dir.path()).is_empty());

        writer.write_all(b"one\n").unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        writer.state.clock.set_now(ts("2024-08-10T00:59:59Z"));
        assert_eq!(writer.write(b"").unwrap(), 0);
        assert_eq!(file_names(temp_dir.path()), vec!["app.log"]);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_stale_file_rotated_on_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, b"yesterday\n").unwrap();
        let mtime = SystemTime::from(ts("2024-08-09T12:00:00Z"));
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let mut writer = writer_at(When::Midnight, ts("2024-08-10T00:00:30Z"))
            .build(&path)
            .unwrap();
        writer.write_all(b"today\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            read_lines(&temp_dir.path().join("app.log.2024-08-09")),
            vec!["yesterday"]
        );
        assert_eq!(read_lines(&path), vec!["today"]);
        assert_eq!(writer.rollover_at(), Some(ts("2024-08-11T00:00:00Z")));
    }

    #[test]
    fn test_failed_rotation_goes_to_trap() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let trap = RecordingTrap::default();
        let mut writer = writer_at(When::Minutes, ts("2024-08-10T00:00:00Z"))
            .trap(trap.clone())
            .build(&path)
            .unwrap();

        writer.write_all(b"one\n").unwrap();

        // a directory where the lock file should be
        fs::create_dir(lock_path(&path)).unwrap();
        writer.state.clock.set_now(ts("2024-08-10T00:01:00Z"));
        writer.write_all(b"two\n").unwrap();
        writer.flush().unwrap();

        let caught = trap.caught();
        assert_eq!(caught.len(), 1);
        assert!(caught[0].starts_with("failed to open rotation lock"));
        assert_eq!(read_lines(&path), vec!["one", "two"]);

        // retried on the next write once the obstacle is gone
        fs::remove_dir(lock_path(&path)).unwrap();
        writer.write_all(b"three\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(
            read_lines(&temp_dir.path().join("app.log.2024-08-10_00-00")),
            vec!["one", "two"]
        );
        assert_eq!(read_lines(&path), vec!["three"]);
        assert_eq!(trap.caught().len(), 1);
    }

    #[test]
    fn test_build_rejects_directory_path() {
        assert!(SharedFileWriter::builder().build("/").is_err());
    }
}
