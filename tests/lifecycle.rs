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
use std::sync::Arc;
use std::sync::Mutex;

use jiff::tz::TimeZone;
use logforth_shared_file::Error;
use logforth_shared_file::Lifecycle;
use logforth_shared_file::append::escalation::Mail;
use logforth_shared_file::append::escalation::MailSender;
use logforth_shared_file::config::HandlerContext;
use logforth_shared_file::config::LoggingSettings;
use logforth_shared_file::config::Registry;

#[derive(Debug, Default, Clone)]
struct RecordingSender {
    sent: Arc<Mutex<Vec<Mail>>>,
}

impl MailSender for RecordingSender {
    fn send(&self, mail: &Mail) -> Result<(), Error> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

#[test]
fn test_install_from_settings() {
    let temp_dir = tempfile::tempdir().unwrap();
    let settings: LoggingSettings = serde_json::from_value(serde_json::json!({
        "app_name": "billing",
        "log_dir": temp_dir.path(),
        "log_interval": "midnight",
        "utc": true,
        "backup_count": 7,
        "targets": { "noisy": "error" },
        "admins": ["ops@example.com"],
    }))
    .unwrap();

    let sender = RecordingSender::default();
    let context = HandlerContext::default()
        .with_timezone(TimeZone::UTC)
        .with_mail_sender(sender.clone());
    let logger = Registry::new()
        .build_logger(&settings, &context, &settings.handler_keys())
        .unwrap();

    let mut lifecycle = Lifecycle::new();
    lifecycle.initialize(logger).unwrap();
    lifecycle.install().unwrap();
    assert!(lifecycle.install().is_err());

    log::info!(target: "billing.web", "request served");
    log::warn!(target: "noisy.client", "ignored");
    log::debug!(target: "billing.web", "below the level");
    log::error!(target: "billing.db", "only an error");
    log::error!(target: "billing.db", critical = true; "database is gone");
    // waits for the mail worker
    lifecycle.shutdown();

    let content = fs::read_to_string(temp_dir.path().join("billing.log")).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("[INFO] [billing/"));
    assert!(lines[0].ends_with("[billing.web]:  request served"));
    assert!(lines[1].contains("[ERROR] [billing/"));
    assert!(lines[2].contains("[CRITICAL] [billing/"));
    assert!(lines[2].ends_with("[billing.db]:  database is gone"));

    let sent = sender.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "CRITICAL: billing database is gone");
    assert_eq!(sent[0].to, vec!["ops@example.com"]);
}
