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

use std::sync::Arc;

use crate::Error;
use crate::Logger;
use crate::logger::install;

/// Owns the process logger from initialization to shutdown.
///
/// A process initializes logging exactly once. The lifecycle refuses a second initialization
/// instead of silently stacking a second set of handlers.
///
/// # Examples
///
/// ```
/// use logforth_shared_file::Lifecycle;
/// use logforth_shared_file::append;
///
/// let mut lifecycle = Lifecycle::new();
/// lifecycle
///     .initialize(
///         logforth_shared_file::builder()
///             .dispatch(|d| d.append(append::Stderr::default()))
///             .build(),
///     )
///     .unwrap();
/// assert!(lifecycle.initialize(logforth_shared_file::builder().build()).is_err());
///
/// lifecycle.shutdown();
/// ```
#[derive(Debug, Default)]
pub struct Lifecycle {
    logger: Option<Arc<Logger>>,
    installed: bool,
}

impl Lifecycle {
    /// Create a lifecycle with no logger yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of the process logger.
    ///
    /// # Errors
    ///
    /// Return an error if a logger has already been initialized.
    pub fn initialize(&mut self, logger: Logger) -> Result<(), Error> {
        if self.logger.is_some() {
            return Err(Error::new("logging is already initialized"));
        }
        self.logger = Some(Arc::new(logger));
        Ok(())
    }

    /// Whether a logger has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.logger.is_some()
    }

    /// The initialized logger.
    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_deref()
    }

    /// Register the initialized logger as the global `log` logger.
    ///
    /// # Errors
    ///
    /// Return an error if no logger has been initialized, or if a global logger is already set.
    pub fn install(&mut self) -> Result<(), Error> {
        let Some(logger) = &self.logger else {
            return Err(Error::new("logging is not initialized"));
        };
        if self.installed {
            return Err(Error::new("logging is already installed"));
        }
        install(logger.clone())?;
        self.installed = true;
        Ok(())
    }

    /// Flush every appender of the logger.
    pub fn shutdown(&self) {
        if let Some(logger) = &self.logger {
            logger.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_once() {
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.is_initialized());
        assert_eq!(
            lifecycle.install().unwrap_err().message(),
            "logging is not initialized"
        );

        lifecycle.initialize(crate::builder().build()).unwrap();
        assert!(lifecycle.is_initialized());
        assert!(lifecycle.logger().is_some());

        let err = lifecycle.initialize(crate::builder().build()).unwrap_err();
        assert_eq!(err.message(), "logging is already initialized");
        lifecycle.shutdown();
    }
}
