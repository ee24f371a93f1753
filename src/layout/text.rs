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

use std::fmt::Write;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;

/// A layout that formats log records as verbose text lines, suited to files shared by many
/// processes.
///
/// Output format:
///
/// ```text
/// [2024-08-11 22:44:57,172] [ERROR] [billing/20211] [billing.amqp]:  connection lost
/// [2024-08-11 22:44:57,173] [INFO] [billing/worker-2/20388] [billing.web]:  request served
/// ```
///
/// Every line names the application, the optional logical worker and the process id, so the
/// interleaved output of several processes can be told apart.
///
/// # Examples
///
/// ```
/// use jiff::tz::TimeZone;
/// use logforth_shared_file::layout::TextLayout;
///
/// let layout = TextLayout::new("billing").timezone(TimeZone::UTC);
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    app_name: String,
    timezone: TimeZone,
}

impl Default for TextLayout {
    fn default() -> Self {
        TextLayout::new("app")
    }
}

impl TextLayout {
    /// Create a text layout for the named application, in the system time zone.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            timezone: TimeZone::system(),
        }
    }

    /// Set the timezone for timestamps.
    ///
    /// Defaults to the system timezone if not set.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.timezone = tz;
        self
    }
}

pub(crate) fn format_time(ts: Timestamp, tz: &TimeZone, with_date: bool) -> String {
    let zoned = ts.to_zoned(tz.clone());
    let millis = zoned.millisecond();
    if with_date {
        format!("{},{millis:03}", zoned.strftime("%Y-%m-%d %H:%M:%S"))
    } else {
        zoned.strftime("%H:%M:%S").to_string()
    }
}

impl Layout for TextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = String::new();

        let time = format_time(record.time(), &self.timezone, true);
        let level = record.level();
        let app = &self.app_name;
        let pid = record.pid();
        let target = record.target();
        let message = record.payload();

        // SAFETY: write to a string always succeeds
        match record.worker() {
            Some(worker) => write!(&mut text, "[{time}] [{level}] [{app}/{worker}/{pid}]").unwrap(),
            None => write!(&mut text, "[{time}] [{level}] [{app}/{pid}]").unwrap(),
        }
        write!(&mut text, " [{target}]:  {message}").unwrap();

        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;

    #[test]
    fn test_text_layout() {
        let time: Timestamp = "2024-08-11T22:44:57.172Z".parse().unwrap();
        let layout = TextLayout::new("billing").timezone(TimeZone::UTC);

        let record = Record::builder()
            .time(time)
            .level(Level::Error)
            .target("billing.amqp")
            .pid(20211)
            .payload("connection lost")
            .build();
        let text = String::from_utf8(layout.format(&record).unwrap()).unwrap();
        assert_eq!(
            text,
            "[2024-08-11 22:44:57,172] [ERROR] [billing/20211] [billing.amqp]:  connection lost"
        );

        let record = Record::builder()
            .time(time)
            .level(Level::Info)
            .target("billing.web")
            .pid(20388)
            .worker("worker-2")
            .payload("request served")
            .build();
        let text = String::from_utf8(layout.format(&record).unwrap()).unwrap();
        assert_eq!(
            text,
            "[2024-08-11 22:44:57,172] [INFO] [billing/worker-2/20388] [billing.web]:  request served"
        );
    }
}
