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

use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use tracing::error;

use crate::QueueError;

/// Rotation timeout applied when [`QueueBuilder::timeout`] is not called.
/// Smaller means more, smaller batch files and lower on-disk latency before
/// replay.
///
/// [`QueueBuilder::timeout`]: crate::QueueBuilder::timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fast-path buffer capacity applied when [`QueueBuilder::buffer_size`] is
/// not called. Smaller pushes elements to disk sooner, larger uses more
/// memory.
///
/// [`QueueBuilder::buffer_size`]: crate::QueueBuilder::buffer_size
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Callback invoked for every operational failure.
///
/// The queue is fire-and-forget: no error is ever returned from `enqueue`,
/// `dequeue` or `close`. Failures are handed to this hook instead.
pub type DiagnosticHook = Arc<dyn Fn(&QueueError) + Send + Sync + 'static>;

/// Queue configuration shared by the frontend and the worker threads.
#[derive(Clone)]
pub struct QueueConfig {
    /// Directory holding this queue's batch files. Owned by exactly one live
    /// queue instance per (dir, prefix) pair.
    pub dir:         PathBuf,
    /// Filename prefix for this queue's batch files.
    pub prefix:      String,
    /// Time after which an open batch file is sealed and handed off.
    pub timeout:     Duration,
    /// Capacity of the in-memory fast-path buffer.
    pub buffer_size: usize,
    /// Failure sink. `None` routes failures to `tracing::error!`.
    pub diagnostics: Option<DiagnosticHook>,
}

impl QueueConfig {
    pub(crate) fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, prefix: S) -> Self {
        Self {
            dir:         dir.into(),
            prefix:      prefix.into(),
            timeout:     DEFAULT_TIMEOUT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            diagnostics: None,
        }
    }

    /// Report an operational failure without propagating it.
    pub(crate) fn report(&self, err: &QueueError) {
        match &self.diagnostics {
            Some(hook) => hook(err),
            None => error!(error = %err, "spill queue failure"),
        }
    }
}

impl fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConfig")
            .field("dir", &self.dir)
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .field("buffer_size", &self.buffer_size)
            .field("diagnostics", &self.diagnostics.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::new("/tmp/q", "demo");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.buffer_size, 1000);
        assert!(config.diagnostics.is_none());
    }

    #[test]
    fn test_report_invokes_hook() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = hits.clone();

        let mut config = QueueConfig::new("/tmp/q", "demo");
        config.diagnostics = Some(Arc::new(move |_err| {
            counted.fetch_add(1, Ordering::Relaxed);
        }));

        config.report(&QueueError::WorkerPanicked { name: "writer" });
        config.report(&QueueError::WorkerPanicked { name: "reader" });
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }
}
