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

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil;
use jiff::tz::TimeZone;

use crate::Error;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// The time unit a shared file rolls over on.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum When {
    /// Every second, counted from the previous rollover.
    Seconds,
    /// Every minute, counted from the previous rollover.
    Minutes,
    /// Every hour, counted from the previous rollover.
    Hours,
    /// Every 24 hours, counted from the previous rollover.
    Day,
    /// At every midnight of the wall clock.
    Midnight,
    /// At the midnight that starts the given weekday of the wall clock; Monday is 0.
    Weekday(u8),
}

impl When {
    /// The length of one rollover interval, in seconds.
    pub fn interval(&self) -> i64 {
        match self {
            When::Seconds => 1,
            When::Minutes => MINUTE,
            When::Hours => HOUR,
            When::Day | When::Midnight => DAY,
            When::Weekday(_) => WEEK,
        }
    }

    /// Whether interval boundaries sit on wall-clock midnights, as opposed to being counted in
    /// elapsed seconds.
    pub fn is_wall_clock(&self) -> bool {
        matches!(self, When::Midnight | When::Weekday(_))
    }

    fn suffix_format(&self) -> &'static str {
        match self {
            When::Seconds => "%Y-%m-%d_%H-%M-%S",
            When::Minutes => "%Y-%m-%d_%H-%M",
            When::Hours => "%Y-%m-%d_%H",
            When::Day | When::Midnight => "%Y-%m-%d",
            When::Weekday(_) => "%G-W%V",
        }
    }
}

impl fmt::Debug for When {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            When::Seconds => f.write_str("S"),
            When::Minutes => f.write_str("M"),
            When::Hours => f.write_str("H"),
            When::Day => f.write_str("D"),
            When::Midnight => f.write_str("MIDNIGHT"),
            When::Weekday(day) => write!(f, "W{day}"),
        }
    }
}

impl fmt::Display for When {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for When {
    type Err = Error;

    /// Parse `S`, `M`, `H`, `D`, `MIDNIGHT` and `W0`..`W6`, case-insensitively. The spelled
    /// out forms `day`, `midnight` and `week-0`..`week-6` are accepted as well.
    fn from_str(s: &str) -> Result<When, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let when = match lower.as_str() {
            "s" => When::Seconds,
            "m" => When::Minutes,
            "h" => When::Hours,
            "d" | "day" => When::Day,
            "midnight" => When::Midnight,
            _ => {
                let day = lower
                    .strip_prefix("week-")
                    .or_else(|| lower.strip_prefix('w'))
                    .and_then(|day| day.parse::<u8>().ok())
                    .filter(|day| *day < 7)
                    .ok_or_else(|| Error::new(format!("malformed rollover interval: {s:?}")))?;
                When::Weekday(day)
            }
        };
        Ok(when)
    }
}

impl<'de> serde::Deserialize<'de> for When {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        When::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Computes rollover instants and archive names for one [`When`].
///
/// The scheduler does no I/O. The time zone is injected so that daylight-saving transitions can
/// be exercised deterministically.
#[derive(Debug, Clone)]
pub struct RotationScheduler {
    when: When,
    utc: bool,
    timezone: TimeZone,
}

impl RotationScheduler {
    /// Create a scheduler on the system time zone, or on UTC if `utc` is set.
    pub fn new(when: When, utc: bool) -> Self {
        let timezone = if utc { TimeZone::UTC } else { TimeZone::system() };
        Self {
            when,
            utc,
            timezone,
        }
    }

    /// Use the given time zone as the local wall clock. Ignored by UTC schedulers.
    pub fn with_timezone(mut self, timezone: TimeZone) -> Self {
        if !self.utc {
            self.timezone = timezone;
        }
        self
    }

    /// The configured time unit.
    pub fn when(&self) -> When {
        self.when
    }

    /// Whether boundaries and names are computed in UTC.
    pub fn utc(&self) -> bool {
        self.utc
    }

    /// The length of one rollover interval, in seconds.
    pub fn interval(&self) -> i64 {
        self.when.interval()
    }

    /// The first rollover instant of a freshly opened file.
    ///
    /// `base_time` is the modification time of the file found on disk, or now if there was
    /// none, so that a restarted process rotates a stale file on its first write.
    pub fn initial_rollover(&self, base_time: Timestamp) -> Timestamp {
        self.next_rollover(None, base_time)
    }

    /// Compute the next rollover instant strictly after `current`.
    ///
    /// Fixed units count whole intervals from `previous` (or from `current` if there is no
    /// previous rollover), skipping every interval that has already elapsed. Wall-clock units
    /// land on the next local midnight (and then the configured weekday), corrected by one hour
    /// when a daylight-saving transition lies between `current` and the boundary.
    pub fn next_rollover(&self, previous: Option<Timestamp>, current: Timestamp) -> Timestamp {
        let current = current.as_second();
        let interval = self.interval();

        let next = if self.when.is_wall_clock() {
            let unadjusted = self.unadjusted_boundary(current);
            let adjusted = unadjusted + self.dst_correction(current, unadjusted);
            if adjusted > current { adjusted } else { unadjusted }
        } else {
            let next = previous.map_or(current, |p| p.as_second()) + interval;
            if next <= current {
                next + ((current - next) / interval + 1) * interval
            } else {
                next
            }
        };

        timestamp(next)
    }

    /// The next wall-clock boundary computed with plain second arithmetic, before any
    /// daylight-saving correction.
    pub(crate) fn unadjusted_boundary(&self, current: i64) -> i64 {
        let zoned = timestamp(current).to_zoned(self.timezone.clone());
        let elapsed =
            i64::from(zoned.hour()) * HOUR + i64::from(zoned.minute()) * MINUTE + i64::from(zoned.second());
        let mut next = current + DAY - elapsed;

        if let When::Weekday(day) = self.when {
            let tomorrow = (i64::from(zoned.weekday().to_monday_zero_offset()) + 1) % 7;
            next += (i64::from(day) - tomorrow).rem_euclid(7) * DAY;
        }

        while next <= current {
            next += self.interval();
        }
        next
    }

    /// The shift that keeps a boundary computed at `from` on the intended wall-clock time at
    /// `to`: one hour earlier if DST began in between, one hour later if it ended.
    fn dst_correction(&self, from: i64, to: i64) -> i64 {
        if self.utc {
            return 0;
        }
        match (self.is_dst(from), self.is_dst(to)) {
            (false, true) => -HOUR,
            (true, false) => HOUR,
            _ => 0,
        }
    }

    fn is_dst(&self, at: i64) -> bool {
        self.timezone
            .to_offset_info(timestamp(at))
            .dst()
            .is_dst()
    }

    /// The archive suffix for the interval that ends at `rollover_at`.
    ///
    /// The suffix names the start of the interval, not the moment the rotation happened to run.
    pub fn archive_suffix(&self, rollover_at: Timestamp) -> String {
        let rollover_at = rollover_at.as_second();
        let mut start = rollover_at - self.interval();
        if self.when.is_wall_clock() {
            start -= self.dst_correction(start, rollover_at);
        }

        timestamp(start)
            .to_zoned(self.timezone.clone())
            .strftime(self.when.suffix_format())
            .to_string()
    }

    /// Whether `suffix` has the shape of an archive suffix this scheduler produces.
    pub fn matches_suffix(&self, suffix: &str) -> bool {
        let template = civil::date(2000, 1, 1)
            .at(0, 0, 0, 0)
            .strftime(self.when.suffix_format())
            .to_string();

        template.len() == suffix.len()
            && template.bytes().zip(suffix.bytes()).all(|(t, s)| {
                if t.is_ascii_digit() {
                    s.is_ascii_digit()
                } else {
                    t == s
                }
            })
    }
}

fn timestamp(second: i64) -> Timestamp {
    Timestamp::from_second(second).unwrap_or(if second < 0 {
        Timestamp::MIN
    } else {
        Timestamp::MAX
    })
}
