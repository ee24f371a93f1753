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

use jiff::tz::TimeZone;

use crate::Error;
use crate::layout::Layout;
use crate::layout::text::format_time;
use crate::record::Record;

/// A terse layout for interactive consoles: wall-clock time and the message.
///
/// Output format:
///
/// ```text
/// 22:44:57 connection lost
/// ```
#[derive(Debug, Clone)]
pub struct CompactLayout {
    timezone: TimeZone,
}

impl Default for CompactLayout {
    fn default() -> Self {
        Self {
            timezone: TimeZone::system(),
        }
    }
}

impl CompactLayout {
    /// Set the timezone for timestamps.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }
}

impl Layout for CompactLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let time = format_time(record.time(), &self.timezone, false);
        Ok(format!("{time} {}", record.payload()).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;

    #[test]
    fn test_compact_layout() {
        let time: Timestamp = "2024-08-11T22:44:57.172Z".parse().unwrap();
        let record = Record::builder().time(time).payload("hello").build();
        let layout = CompactLayout::default().timezone(TimeZone::UTC);
        assert_eq!(layout.format(&record).unwrap(), b"22:44:57 hello");
    }
}
