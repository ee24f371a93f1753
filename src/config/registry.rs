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

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use jiff::tz::TimeZone;

use crate::Error;
use crate::Logger;
use crate::append::Append;
use crate::append::Escalation;
use crate::append::Null;
use crate::append::SharedFile;
use crate::append::Stderr;
use crate::append::escalation::MailSender;
use crate::append::escalation::Sendmail;
use crate::append::shared_file::SharedFileWriter;
use crate::config::LoggingSettings;
use crate::layout::CompactLayout;
use crate::layout::TextLayout;

/// Builds one handler from the settings.
pub type HandlerFactory = fn(&LoggingSettings, &HandlerContext) -> Result<Box<dyn Append>, Error>;

/// Collaborators handlers need beyond the settings.
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    mail_sender: Option<Arc<dyn MailSender>>,
    timezone: Option<TimeZone>,
}

impl HandlerContext {
    /// Deliver escalation mails through this sender instead of the local `sendmail`.
    pub fn with_mail_sender(mut self, sender: impl MailSender) -> Self {
        self.mail_sender = Some(Arc::new(sender));
        self
    }

    /// Use this time zone instead of the system time zone.
    pub fn with_timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = Some(timezone);
        self
    }

    fn timezone(&self) -> TimeZone {
        self.timezone.clone().unwrap_or_else(TimeZone::system)
    }
}

/// The table of handler kinds, keyed by the names configurations use.
///
/// Every key is resolved when the logger is built; an unknown key fails the build instead of
/// being skipped.
pub struct Registry {
    factories: BTreeMap<&'static str, HandlerFactory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// The shared rotating log file.
    pub const FILE: &'static str = "file";
    /// Terse records on standard error.
    pub const CONSOLE: &'static str = "console";
    /// Critical records mailed to the admins.
    pub const MAIL_ADMINS: &'static str = "mail_admins";
    /// Discards everything.
    pub const NULL: &'static str = "null";

    /// Create the registry of built-in handlers.
    pub fn new() -> Self {
        let mut factories = BTreeMap::<&'static str, HandlerFactory>::new();
        factories.insert(Self::FILE, file);
        factories.insert(Self::CONSOLE, console);
        factories.insert(Self::MAIL_ADMINS, mail_admins);
        factories.insert(Self::NULL, null);
        Self { factories }
    }

    /// The known handler keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Build the handler registered under `key`.
    pub fn create(
        &self,
        key: &str,
        settings: &LoggingSettings,
        context: &HandlerContext,
    ) -> Result<Box<dyn Append>, Error> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| Error::new("unknown log handler").with_context("key", key))?;
        factory(settings, context).map_err(|err| {
            Error::new("failed to build log handler")
                .with_context("key", key)
                .with_source(err)
        })
    }

    /// Build a logger with one dispatch per handler key.
    ///
    /// Every dispatch filters by the settings' level and per-target levels.
    pub fn build_logger(
        &self,
        settings: &LoggingSettings,
        context: &HandlerContext,
        keys: &[&str],
    ) -> Result<Logger, Error> {
        let mut builder = crate::builder();
        for key in keys {
            let append = self.create(key, settings, context)?;
            builder = builder.dispatch(|d| {
                let mut d = d.min_level(settings.level());
                for (target, level) in &settings.targets {
                    d = d.target_level(target.clone(), *level);
                }
                d.append(append)
            });
        }
        if let Some(worker) = &settings.worker {
            builder = builder.worker(worker.clone());
        }
        Ok(builder.build())
    }
}

fn file(settings: &LoggingSettings, context: &HandlerContext) -> Result<Box<dyn Append>, Error> {
    let timezone = context.timezone();
    let writer = SharedFileWriter::builder()
        .when(settings.log_interval)
        .utc(settings.utc)
        .timezone(timezone.clone())
        .backup_count(settings.backup_count)
        .build(settings.log_file())?;
    let layout = TextLayout::new(settings.app_name.clone()).timezone(timezone);
    Ok(Box::new(SharedFile::new(writer).with_layout(layout)))
}

fn console(_: &LoggingSettings, context: &HandlerContext) -> Result<Box<dyn Append>, Error> {
    let layout = CompactLayout::default().timezone(context.timezone());
    Ok(Box::new(Stderr::default().with_layout(layout)))
}

fn mail_admins(
    settings: &LoggingSettings,
    context: &HandlerContext,
) -> Result<Box<dyn Append>, Error> {
    let sender: Box<dyn MailSender> = match &context.mail_sender {
        Some(sender) => Box::new(sender.clone()),
        None => Box::new(Sendmail::default()),
    };
    let layout = TextLayout::new(settings.app_name.clone()).timezone(context.timezone());
    let escalation = Escalation::builder(sender)
        .app_name(settings.app_name.clone())
        .from(settings.email_from.clone())
        .to(settings.admins.iter().cloned())
        .layout(layout)
        .build()?;
    Ok(Box::new(escalation))
}

fn null(_: &LoggingSettings, _: &HandlerContext) -> Result<Box<dyn Append>, Error> {
    Ok(Box::new(Null::default()))
}
