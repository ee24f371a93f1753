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
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::sync::Arc;

use crate::Error;

/// A mail ready to be handed to a [`MailSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    /// The subject, already escaped to a single header line.
    pub subject: String,
    /// The plain-text body.
    pub body: String,
    /// The sender address.
    pub from: String,
    /// The recipient addresses.
    pub to: Vec<String>,
}

impl Mail {
    /// Render the mail as an RFC 822 message.
    pub fn to_message(&self) -> String {
        let mut message = String::new();
        message.push_str(&format!("From: {}\n", self.from));
        message.push_str(&format!("To: {}\n", self.to.join(", ")));
        message.push_str(&format!("Subject: {}\n", self.subject));
        message.push_str("MIME-Version: 1.0\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\n");
        message.push('\n');
        message.push_str(&self.body);
        if !self.body.ends_with('\n') {
            message.push('\n');
        }
        message
    }
}

/// A transport that delivers mails.
///
/// Senders run on the escalation worker thread, never on the logging call path, so they may
/// block.
pub trait MailSender: fmt::Debug + Send + Sync + 'static {
    /// Deliver one mail.
    fn send(&self, mail: &Mail) -> Result<(), Error>;
}

impl<T: MailSender> From<T> for Box<dyn MailSender> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl MailSender for Arc<dyn MailSender> {
    fn send(&self, mail: &Mail) -> Result<(), Error> {
        self.as_ref().send(mail)
    }
}

/// A sender that pipes mails to a local `sendmail` compatible program.
///
/// The program is invoked as `<program> -t -i`, so recipients are read from the message
/// headers.
#[derive(Debug, Clone)]
pub struct Sendmail {
    program: PathBuf,
}

impl Default for Sendmail {
    fn default() -> Self {
        Sendmail::new("/usr/sbin/sendmail")
    }
}

impl Sendmail {
    /// Create a sender that runs the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MailSender for Sendmail {
    fn send(&self, mail: &Mail) -> Result<(), Error> {
        let mut child = Command::new(&self.program)
            .arg("-t")
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|err| {
                Error::new("failed to spawn sendmail")
                    .with_path(&self.program)
                    .with_source(err)
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(mail.to_message().as_bytes()) {
                // the program quit without reading; its exit status tells why
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::new("failed to pipe mail to sendmail").with_source(err));
                }
                Ok(()) => {}
            }
        }

        let status = child
            .wait()
            .map_err(|err| Error::new("failed to wait for sendmail").with_source(err))?;
        if !status.success() {
            return Err(Error::new("sendmail exited with failure")
                .with_path(&self.program)
                .with_context("status", status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> Mail {
        Mail {
            subject: "CRITICAL: billing db down".to_string(),
            body: "the database is gone".to_string(),
            from: "billing@example.com".to_string(),
            to: vec!["ops@example.com".to_string(), "dev@example.com".to_string()],
        }
    }

    #[test]
    fn test_mail_to_message() {
        assert_eq!(
            mail().to_message(),
            concat!(
                "From: billing@example.com\n",
                "To: ops@example.com, dev@example.com\n",
                "Subject: CRITICAL: billing db down\n",
                "MIME-Version: 1.0\n",
                "Content-Type: text/plain; charset=utf-8\n",
                "\n",
                "the database is gone\n",
            )
        );
    }

    #[test]
    fn test_sendmail_reports_exit_status() {
        // `true` and `false` ignore their arguments
        assert!(Sendmail::new("true").send(&mail()).is_ok());

        let err = Sendmail::new("false").send(&mail()).unwrap_err();
        assert_eq!(err.message(), "sendmail exited with failure");

        let err = Sendmail::new("/nonexistent/sendmail")
            .send(&mail())
            .unwrap_err();
        assert_eq!(err.message(), "failed to spawn sendmail");
    }
}
