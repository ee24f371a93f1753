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

use std::io::Write;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::append::Append;
use crate::append::shared_file::SharedFileWriter;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::record::Record;

/// An appender that writes log records to a file shared by many processes.
#[derive(Debug)]
pub struct SharedFile {
    layout: Box<dyn Layout>,
    writer: Mutex<SharedFileWriter>,
}

impl SharedFile {
    /// Creates a new [`SharedFile`] appender.
    ///
    /// This appender by default uses [`TextLayout`] to format log records.
    pub fn new(writer: SharedFileWriter) -> Self {
        Self {
            layout: Box::new(TextLayout::default()),
            writer: Mutex::new(writer),
        }
    }

    /// Sets the layout used to format log records.
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// How many due rotations this appender skipped because another process was rotating.
    ///
    /// See [`SharedFileWriter::skipped_rotations`].
    pub fn skipped_rotations(&self) -> u64 {
        self.writer().skipped_rotations()
    }

    fn writer(&self) -> MutexGuard<'_, SharedFileWriter> {
        // a panic while holding the lock leaves the writer itself consistent
        self.writer.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Append for SharedFile {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        let mut writer = self.writer();
        writer.write_all(&bytes).map_err(Error::from_io_error)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self.writer();
        writer.flush().map_err(Error::from_io_error)?;
        Ok(())
    }
}

impl Drop for SharedFile {
    fn drop(&mut self) {
        let writer = self
            .writer
            .get_mut()
            .unwrap_or_else(|poison| poison.into_inner());
        let _ = writer.flush();
    }
}
