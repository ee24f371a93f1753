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

//! Appender that escalates critical records to operators by mail.
//!
//! Mails are handed to a background worker through a bounded queue and sent from there. A slow
//! or broken mail transport can delay or lose mails, but never blocks or fails the logging call
//! that produced them: every failure goes to the [`Trap`].
//!
//! # Example
//!
//! ```
//! use logforth_shared_file::append::escalation::Escalation;
//! use logforth_shared_file::append::escalation::Sendmail;
//!
//! let escalation = Escalation::builder(Sendmail::default())
//!     .app_name("billing")
//!     .from("billing@example.com")
//!     .to(["ops@example.com"])
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

pub use self::mail::Mail;
pub use self::mail::MailSender;
pub use self::mail::Sendmail;
use self::worker::Worker;
use self::worker::WorkerState;
use crate::Error;
use crate::append::Append;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::record::Level;
use crate::record::Record;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

mod mail;
mod worker;

/// The longest subject that fits one RFC 2822 header line (998 characters) after `Subject: `.
pub const MAX_SUBJECT_LEN: usize = 989;

/// Escape carriage returns and line feeds to the literal sequences `\r` and `\n`, and cut the
/// result to [`MAX_SUBJECT_LEN`] characters.
pub fn format_subject(subject: &str) -> String {
    subject
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .chars()
        .take(MAX_SUBJECT_LEN)
        .collect()
}

/// An appender that mails records at or above a threshold level, [`Level::Crit`] by default.
#[derive(Debug)]
pub struct Escalation {
    app_name: String,
    threshold: Level,
    from: String,
    to: Vec<String>,
    layout: Box<dyn Layout>,
    trap: Arc<dyn Trap>,
    state: WorkerState,
}

impl Escalation {
    /// Create a new [`EscalationBuilder`] that delivers through the given sender.
    pub fn builder(sender: impl Into<Box<dyn MailSender>>) -> EscalationBuilder {
        EscalationBuilder::new(sender)
    }

    fn subject(&self, record: &Record) -> String {
        let subject = format!("{}: {} {}", record.level(), self.app_name, record.payload());
        format_subject(&subject)
    }

    fn escalate(&self, record: &Record) -> Result<(), Error> {
        let body = self.layout.format(record)?;
        let mail = Mail {
            subject: self.subject(record),
            body: String::from_utf8_lossy(&body).into_owned(),
            from: self.from.clone(),
            to: self.to.clone(),
        };
        self.state.send_mail(mail)
    }
}

impl Append for Escalation {
    fn append(&self, record: &Record) -> Result<(), Error> {
        if record.level() < self.threshold {
            return Ok(());
        }

        if let Err(err) = self.escalate(record) {
            self.trap.trap(&err);
        }
        Ok(())
    }

    /// Wait until every mail queued so far has been handed to the sender.
    fn flush(&self) -> Result<(), Error> {
        self.state.flush()
    }
}

/// A builder for configuring an [`Escalation`] appender.
#[derive(Debug)]
pub struct EscalationBuilder {
    sender: Box<dyn MailSender>,
    app_name: String,
    threshold: Level,
    from: String,
    to: Vec<String>,
    layout: Option<Box<dyn Layout>>,
    queue_capacity: usize,
    trap: Box<dyn Trap>,
}

impl EscalationBuilder {
    fn new(sender: impl Into<Box<dyn MailSender>>) -> Self {
        Self {
            sender: sender.into(),
            app_name: "app".to_string(),
            threshold: Level::Crit,
            from: "root@localhost".to_string(),
            to: vec![],
            layout: None,
            queue_capacity: 64,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the application name shown in subjects, and in bodies unless a layout is set.
    #[must_use]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Set the lowest level that is mailed.
    #[must_use]
    pub fn threshold(mut self, threshold: Level) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the sender address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Set the recipient addresses.
    #[must_use]
    pub fn to<I, S>(mut self, to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to = to.into_iter().map(Into::into).collect();
        self
    }

    /// Set the layout of mail bodies. Defaults to [`TextLayout`].
    #[must_use]
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Set how many mails may wait for the worker before new ones are dropped.
    #[must_use]
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the trap that receives dropped and failed mails.
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Start the worker and build the [`Escalation`] appender.
    pub fn build(self) -> Result<Escalation, Error> {
        let Self {
            sender,
            app_name,
            threshold,
            from,
            to,
            layout,
            queue_capacity,
            trap,
        } = self;

        if to.is_empty() {
            return Err(Error::new("escalation has no recipients"));
        }

        let layout = layout.unwrap_or_else(|| Box::new(TextLayout::new(app_name.clone())));
        let trap: Arc<dyn Trap> = Arc::from(trap);

        let (mail_sender, receiver) = crossbeam_channel::bounded(queue_capacity.max(1));
        let worker = Worker::new(receiver, sender, trap.clone());
        let handle = std::thread::Builder::new()
            .name("logforth-escalation".to_string())
            .spawn(move || worker.run())
            .map_err(|err| Error::new("failed to spawn escalation thread").with_source(err))?;

        Ok(Escalation {
            app_name,
            threshold,
            from,
            to,
            layout,
            trap,
            state: WorkerState::new(mail_sender, handle),
        })
    }
}
