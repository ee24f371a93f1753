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

//! Traps for errors that must not reach the logging call site.
//!
//! A failed rotation, a backup that cannot be pruned, or a mail transport that is down must
//! never fail the `append` call that happened to trigger them. Such errors are handed to a
//! [`Trap`] instead.

use std::fmt;
use std::io;
use std::io::Write;

use crate::Error;

/// A sink for errors raised on a code path that cannot return them to the caller.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Handle an error.
    fn trap(&self, err: &Error);
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A default trap that sends errors to standard error if possible.
///
/// If standard error is not available, it does nothing.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _ = writeln!(io::stderr(), "{err}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    /// A trap that remembers the messages of everything it caught.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingTrap {
        caught: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingTrap {
        pub(crate) fn caught(&self) -> Vec<String> {
            self.caught.lock().unwrap().clone()
        }
    }

    impl Trap for RecordingTrap {
        fn trap(&self, err: &Error) {
            self.caught.lock().unwrap().push(err.to_string());
        }
    }
}
