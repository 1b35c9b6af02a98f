// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{Codec, Queue, QueueConfig, QueueError, Result};

/// Builder for [`Queue`].
///
/// Batch files land in `<dir>/<prefix>-<timestamp>.spill`; the directory is
/// created if missing and must be owned by exactly one live queue instance
/// per (dir, prefix) pair.
pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, prefix: S) -> Self {
        Self {
            config: QueueConfig::new(dir, prefix),
        }
    }

    /// Time after which an open batch file is sealed and handed to the
    /// reader. Smaller means more, smaller files and lower latency before
    /// spilled elements come back. Default 10 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Capacity of the in-memory fast-path buffer. Smaller pushes elements
    /// to disk sooner, larger uses more memory. Default 1000.
    #[must_use]
    pub fn buffer_size(mut self, capacity: usize) -> Self {
        self.config.buffer_size = capacity;
        self
    }

    /// Install a diagnostic hook for operational failures. Without one,
    /// failures are logged through `tracing::error!`.
    #[must_use]
    pub fn diagnostics<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueError) + Send + Sync + 'static,
    {
        self.config.diagnostics = Some(Arc::new(hook));
        self
    }

    /// Build the queue, binding `codec` for element serialization.
    ///
    /// Performs the startup scan and spawns the pipeline workers; leftover
    /// batch files from a previous run are replayed ahead of new spills.
    pub fn build<C: Codec>(self, codec: C) -> Result<Queue<C>> {
        Queue::new(self.config, codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_TIMEOUT};

    #[test]
    fn test_builder_defaults() {
        let builder = QueueBuilder::new("/tmp/spillq-test", "demo");
        assert_eq!(builder.config.dir, PathBuf::from("/tmp/spillq-test"));
        assert_eq!(builder.config.prefix, "demo");
        assert_eq!(builder.config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(builder.config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(builder.config.diagnostics.is_none());
    }

    #[test]
    fn test_builder_custom_config() {
        let builder = QueueBuilder::new("/tmp/spillq-test", "demo")
            .timeout(Duration::from_millis(250))
            .buffer_size(4)
            .diagnostics(|_err| {});

        assert_eq!(builder.config.timeout, Duration::from_millis(250));
        assert_eq!(builder.config.buffer_size, 4);
        assert!(builder.config.diagnostics.is_some());
    }
}
