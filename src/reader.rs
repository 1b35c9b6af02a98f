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

//! Disk reader: replays sealed batch files into the fast-path buffer.
//!
//! A single worker consumes filenames from the scheduler in delivered order.
//! Each file is opened and immediately unlinked; the open handle stays
//! readable, disk space is reclaimed eagerly, and a crash mid-file never
//! replays the same file twice (the unread tail is the accepted loss).
//! Elements are then decoded one at a time and re-injected into the
//! fast-path buffer with a blocking send; a full buffer here is what backs
//! the whole disk subsystem up behind a slow consumer.

use std::{
    fs::{self, File},
    io::BufReader,
    path::PathBuf,
    sync::Arc,
};

use crossbeam::channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::{Codec, QueueConfig, error::QueueError};

/// Worker streaming scheduled batch files back into memory.
pub(crate) struct SpillReader<C: Codec> {
    deliver_rx: Receiver<PathBuf>,
    fast_tx:    Sender<C::Item>,
    config:     Arc<QueueConfig>,
    codec:      Arc<C>,
}

impl<C: Codec> SpillReader<C> {
    pub(crate) fn new(
        deliver_rx: Receiver<PathBuf>,
        fast_tx: Sender<C::Item>,
        config: Arc<QueueConfig>,
        codec: Arc<C>,
    ) -> Self {
        Self {
            deliver_rx,
            fast_tx,
            config,
            codec,
        }
    }

    /// Main loop. Returns when the scheduler signals that no more filenames
    /// will arrive; dropping the fast-path sender on return lets the
    /// consumer stream terminate once the frontend's sender is gone too.
    pub(crate) fn run(self) {
        info!("spill reader starting");

        for path in &self.deliver_rx {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(source) => {
                    self.config.report(&QueueError::OpenBatch { path, source });
                    continue;
                }
            };

            // Unlink while the handle is open; reads continue from the
            // orphaned inode.
            if let Err(error) = fs::remove_file(&path) {
                warn!(path = %path.display(), %error, "failed to unlink batch file");
            }

            let mut input = BufReader::new(file);
            let mut replayed = 0u64;
            loop {
                match self.codec.decode(&mut input) {
                    Ok(Some(item)) => {
                        if self.fast_tx.send(item).is_err() {
                            debug!("all consumers gone; spill reader exiting");
                            return;
                        }
                        replayed += 1;
                    }
                    Ok(None) => break,
                    Err(source) => {
                        self.config.report(&QueueError::Decode { path: path.clone(), source });
                        break;
                    }
                }
            }
            debug!(path = %path.display(), replayed, "finished batch file");
        }

        info!("spill reader stopped");
    }
}
