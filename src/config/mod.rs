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

//! Configuration of the logging stack.
//!
//! [`LoggingSettings`] is plain data, deserialized from whatever configuration source the
//! application uses. The [`Registry`] turns it into a [`Logger`](crate::Logger).

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use serde::Deserialize;

use crate::append::shared_file::When;
use crate::record::Level;

mod registry;
pub use self::registry::HandlerContext;
pub use self::registry::HandlerFactory;
pub use self::registry::Registry;

/// Settings of the logging stack of one application.
///
/// Every field has a default, so a configuration only names what it changes.
///
/// # Examples
///
/// ```
/// use logforth_shared_file::config::LoggingSettings;
///
/// let settings = LoggingSettings {
///     app_name: "billing".to_string(),
///     backup_count: 14,
///     ..LoggingSettings::default()
/// };
/// assert_eq!(settings.handler_keys(), vec!["file"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// The application name shown in every file record and escalation subject.
    pub app_name: String,
    /// Log at `DEBUG` instead of `INFO`.
    pub debug: bool,
    /// An explicit level, overriding `debug`.
    pub level: Option<Level>,
    /// The directory of the log file.
    ///
    /// Defaults to `$LOG_DIR`, or `logs` in the account's home directory if that is unset.
    pub log_dir: PathBuf,
    /// The log file name. Defaults to `<app_name>.log`.
    pub log_file_name: Option<String>,
    /// The rotation interval of the log file.
    pub log_interval: When,
    /// Rotate and name archives in UTC.
    pub utc: bool,
    /// How many archives to keep; `0` keeps all of them.
    pub backup_count: usize,
    /// Also print every record to the console.
    pub redirect_to_console: bool,
    /// Per-target minimum levels, for noisy dependencies.
    pub targets: BTreeMap<String, Level>,
    /// Addresses that receive critical records.
    pub admins: Vec<String>,
    /// The sender address of escalation mails.
    pub email_from: String,
    /// The logical worker name of this process, if it is one of several.
    pub worker: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            app_name: "app".to_string(),
            debug: false,
            level: None,
            log_dir: default_log_dir(),
            log_file_name: None,
            log_interval: When::Day,
            utc: false,
            backup_count: 0,
            redirect_to_console: false,
            targets: BTreeMap::new(),
            admins: vec![],
            email_from: "root@localhost".to_string(),
            worker: None,
        }
    }
}

fn default_log_dir() -> PathBuf {
    log_dir_from(std::env::var_os("LOG_DIR"), dirs::home_dir())
}

// An empty `LOG_DIR` counts as unset.
fn log_dir_from(log_dir: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    match log_dir.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home.unwrap_or_default().join("logs"),
    }
}

impl LoggingSettings {
    /// Settings for a command-line script: logs go to `<script_name>.log` and to the console.
    pub fn for_script(script_name: &str) -> Self {
        Self {
            app_name: script_name.to_string(),
            log_file_name: Some(format!("{script_name}.log")),
            redirect_to_console: true,
            ..Self::default()
        }
    }

    /// The effective minimum level.
    pub fn level(&self) -> Level {
        match self.level {
            Some(level) => level,
            None if self.debug => Level::Debug,
            None => Level::Info,
        }
    }

    /// The full path of the log file.
    pub fn log_file(&self) -> PathBuf {
        match &self.log_file_name {
            Some(name) => self.log_dir.join(name),
            None => self.log_dir.join(format!("{}.log", self.app_name)),
        }
    }

    /// The registry keys of the handlers these settings ask for.
    pub fn handler_keys(&self) -> Vec<&'static str> {
        let mut keys = vec![Registry::FILE];
        if self.redirect_to_console {
            keys.push(Registry::CONSOLE);
        }
        if !self.admins.is_empty() {
            keys.push(Registry::MAIL_ADMINS);
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LoggingSettings::default();
        assert_eq!(settings.level(), Level::Info);
        assert_eq!(settings.log_interval, When::Day);
        assert_eq!(settings.log_file(), settings.log_dir.join("app.log"));
        assert_eq!(settings.handler_keys(), vec!["file"]);
    }

    #[test]
    fn test_deserialize() {
        let settings: LoggingSettings = serde_json::from_str(
            r#"{
                "app_name": "billing",
                "debug": true,
                "log_dir": "/var/log/billing",
                "log_interval": "W0",
                "utc": true,
                "backup_count": 8,
                "targets": { "pika": "WARNING" },
                "admins": ["ops@example.com"]
            }"#,
        )
        .unwrap();

        assert_eq!(settings.level(), Level::Debug);
        assert_eq!(settings.log_interval, When::Weekday(0));
        assert_eq!(settings.log_file(), PathBuf::from("/var/log/billing/billing.log"));
        assert_eq!(settings.targets.get("pika"), Some(&Level::Warn));
        assert_eq!(settings.handler_keys(), vec!["file", "mail_admins"]);
        assert_eq!(settings.email_from, "root@localhost");

        let settings: LoggingSettings =
            serde_json::from_str(r#"{ "debug": true, "level": "error" }"#).unwrap();
        assert_eq!(settings.level(), Level::Error);

        assert!(serde_json::from_str::<LoggingSettings>(r#"{ "log_interval": "W9" }"#).is_err());
    }

    #[test]
    fn test_default_log_dir() {
        let home = PathBuf::from("/home/billing");
        assert_eq!(
            log_dir_from(None, Some(home.clone())),
            PathBuf::from("/home/billing/logs")
        );
        assert_eq!(
            log_dir_from(Some(OsString::new()), Some(home.clone())),
            PathBuf::from("/home/billing/logs")
        );
        assert_eq!(
            log_dir_from(Some(OsString::from("/var/log/billing")), Some(home)),
            PathBuf::from("/var/log/billing")
        );
        assert_eq!(log_dir_from(None, None), PathBuf::from("logs"));

        // the account's home comes from the platform, not only from `$HOME`
        if std::env::var_os("LOG_DIR").is_none() {
            let home = dirs::home_dir().unwrap();
            assert_eq!(LoggingSettings::default().log_dir, home.join("logs"));
        }
    }

    #[test]
    fn test_for_script() {
        let settings = LoggingSettings::for_script("reindex");
        assert_eq!(settings.log_file(), settings.log_dir.join("reindex.log"));
        assert_eq!(settings.handler_keys(), vec!["file", "console"]);
    }
}
