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

//! Overflow writer: spills elements that did not fit in memory to disk.
//!
//! A single worker drains the overflow path. The first element after an idle
//! period creates a new batch file and arms the rotation timer; subsequent
//! elements are appended to the open file. When the timer fires, the file is
//! sealed and its name handed to the scheduler, and the worker goes idle
//! again. On shutdown (overflow path disconnects) any open file is sealed
//! and handed off before the worker drops its scheduler sender and exits.
//!
//! A batch-file create failure does not kill the worker: the element that
//! needed the file is reported and dropped, and the next element retries the
//! create. Overflow delivery degrades to reported loss while the disk is
//! unavailable instead of stalling producers forever.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use chrono::Utc;
use crossbeam::{
    channel::{Receiver, Sender, after, never},
    select,
};
use tracing::{debug, info};

use crate::{
    Codec, QueueConfig,
    error::QueueError,
    path::batch_file_path,
};

/// Batch file currently open for writing.
struct OpenBatch {
    path: PathBuf,
    out:  BufWriter<File>,
}

/// Worker draining the overflow path into timestamped batch files.
pub(crate) struct SpillWriter<C: Codec> {
    overflow_rx: Receiver<C::Item>,
    sealed_tx:   Sender<PathBuf>,
    config:      Arc<QueueConfig>,
    codec:       Arc<C>,
}

impl<C: Codec> SpillWriter<C> {
    pub(crate) fn new(
        overflow_rx: Receiver<C::Item>,
        sealed_tx: Sender<PathBuf>,
        config: Arc<QueueConfig>,
        codec: Arc<C>,
    ) -> Self {
        Self {
            overflow_rx,
            sealed_tx,
            config,
            codec,
        }
    }

    /// Main loop. Returns when the overflow path disconnects; the scheduler
    /// sender is dropped on return, which closes the downstream stage.
    pub(crate) fn run(self) {
        info!("spill writer starting");

        let mut batch: Option<OpenBatch> = None;
        let mut rotation = never();
        let overflow_rx = &self.overflow_rx;

        loop {
            select! {
                recv(overflow_rx) -> msg => {
                    let Ok(item) = msg else { break };

                    if batch.is_none() {
                        batch = self.create_batch();
                        if batch.is_some() {
                            rotation = after(self.config.timeout);
                        }
                    }
                    if let Some(open) = batch.as_mut() {
                        if let Err(source) = self.codec.encode(&item, &mut open.out) {
                            self.config.report(&QueueError::Encode { source });
                        }
                    }
                }
                recv(rotation) -> _ => {
                    if let Some(open) = batch.take() {
                        self.seal(open);
                    }
                    rotation = never();
                }
            }
        }

        if let Some(open) = batch.take() {
            self.seal(open);
        }
        info!("spill writer stopped");
    }

    /// Open a new timestamped batch file, or report and return `None`.
    /// The element that triggered the create is lost in the `None` case.
    fn create_batch(&self) -> Option<OpenBatch> {
        let path = batch_file_path(&self.config.dir, &self.config.prefix, Utc::now());
        match File::create(&path) {
            Ok(file) => {
                debug!(path = %path.display(), "created batch file");
                Some(OpenBatch {
                    path,
                    out: BufWriter::new(file),
                })
            }
            Err(source) => {
                self.config.report(&QueueError::CreateBatch { path, source });
                None
            }
        }
    }

    /// Flush and close the open file, then hand its name to the scheduler.
    fn seal(&self, open: OpenBatch) {
        let OpenBatch { path, mut out } = open;
        if let Err(source) = out.flush() {
            self.config.report(&QueueError::SealBatch {
                path: path.clone(),
                source,
            });
        }
        drop(out);
        debug!(path = %path.display(), "sealed batch file");

        // Fails only if the scheduler is already gone, i.e. the whole
        // pipeline is being torn down without a reader.
        let _ = self.sealed_tx.send(path);
    }
}
