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

//! Queue frontend and lifecycle management.
//!
//! ```text
//!  enqueue() ──────────► fast-path buffer ──────────► dequeue()
//!      │ (full)                  ▲
//!      ▼                        │
//!  overflow path ► writer ► scheduler ► reader
//!                    │                    │
//!                batch files on disk ─────┘
//! ```
//!
//! Elements flow through the bounded fast-path buffer whenever it has room.
//! A full buffer diverts the element to the overflow path, a zero-capacity
//! rendezvous with the spill writer: producers block only when the disk
//! subsystem itself is saturated.
//! Startup replays batch files left over from a previous run ahead of
//! anything the new run spills.
//!
//! Relative order is preserved among fast-path elements and among disk-path
//! elements (file order), but not across the two paths.

use std::{
    fs::File,
    io::{BufWriter, Write},
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    Codec, QueueConfig, Result,
    error::{CreateDirSnafu, QueueError, SpawnSnafu},
    path::{drain_file_path, scan_batch_files},
    reader::SpillReader,
    scheduler,
    writer::SpillWriter,
};

/// A bounded in-memory queue with transparent disk-based overflow.
///
/// Producers call [`enqueue`](Self::enqueue) from any number of threads;
/// consumers iterate the receiver returned by [`dequeue`](Self::dequeue).
/// Bursts beyond the buffer capacity spill to batch files under the queue's
/// directory and are replayed as the consumer catches up, or by the next
/// queue instance constructed over the same directory.
pub struct Queue<C: Codec> {
    config:      Arc<QueueConfig>,
    codec:       Arc<C>,
    fast_tx:     Sender<C::Item>,
    fast_rx:     Receiver<C::Item>,
    overflow_tx: Sender<C::Item>,
    writer:      JoinHandle<()>,
    scheduler:   JoinHandle<()>,
    reader:      JoinHandle<()>,
}

impl<C: Codec> Queue<C> {
    /// Create a queue over `config.dir`, spawning the three pipeline
    /// workers and replaying files left over from a previous run.
    pub(crate) fn new(config: QueueConfig, codec: C) -> Result<Self> {
        let config = Arc::new(config);
        let codec = Arc::new(codec);

        std::fs::create_dir_all(&config.dir).context(CreateDirSnafu { path: &config.dir })?;
        let leftovers = scan_batch_files(&config.dir, &config.prefix)?;

        let (fast_tx, fast_rx) = bounded(config.buffer_size);
        let (overflow_tx, overflow_rx) = bounded(0);
        let (sealed_tx, sealed_rx) = bounded(0);
        let (deliver_tx, deliver_rx) = bounded(0);

        let writer = SpillWriter::new(
            overflow_rx,
            sealed_tx.clone(),
            config.clone(),
            codec.clone(),
        );
        let writer = thread::Builder::new()
            .name("spillq-writer".into())
            .spawn(move || writer.run())
            .context(SpawnSnafu { name: "writer" })?;

        let scheduler = thread::Builder::new()
            .name("spillq-scheduler".into())
            .spawn(move || scheduler::run(&sealed_rx, &deliver_tx))
            .context(SpawnSnafu { name: "scheduler" })?;

        let reader = SpillReader::new(deliver_rx, fast_tx.clone(), config.clone(), codec.clone());
        let reader = thread::Builder::new()
            .name("spillq-reader".into())
            .spawn(move || reader.run())
            .context(SpawnSnafu { name: "reader" })?;

        // Replay strictly precedes anything the writer can produce: the
        // scheduler is FIFO and the overflow path has accepted nothing yet.
        let replayed = leftovers.len();
        for path in leftovers {
            sealed_tx
                .send(path)
                .expect("file scheduler terminated during startup replay");
        }
        drop(sealed_tx);

        info!(
            dir = %config.dir.display(),
            prefix = %config.prefix,
            buffer_size = config.buffer_size,
            replayed,
            "queue started"
        );

        Ok(Self {
            config,
            codec,
            fast_tx,
            fast_rx,
            overflow_tx,
            writer,
            scheduler,
            reader,
        })
    }

    /// Add an element to the queue.
    ///
    /// Never fails. Returns immediately while the fast-path buffer has room;
    /// a full buffer turns this into a blocking hand-off to the spill
    /// writer, so callers stall only when the disk subsystem is saturated.
    /// Safe to call from any number of threads.
    pub fn enqueue(&self, element: C::Item) {
        match self.fast_tx.try_send(element) {
            Ok(()) => {}
            Err(TrySendError::Full(element)) => {
                self.overflow_tx
                    .send(element)
                    .expect("overflow path is closed");
            }
            Err(TrySendError::Disconnected(_)) => {
                unreachable!("fast-path receiver lives as long as the queue")
            }
        }
    }

    /// The consuming side of the queue.
    ///
    /// Consumers block on the receiver until an element is available; the
    /// stream terminates after [`close`](Self::close) has drained the
    /// pipeline. Clones may be handed to multiple consumer threads.
    #[must_use]
    pub fn dequeue(&self) -> Receiver<C::Item> { self.fast_rx.clone() }

    /// Shut the queue down.
    ///
    /// Closing the overflow path cascades through writer → scheduler →
    /// reader; whatever then remains in the fast-path buffer is serialized
    /// into the reserved drain file so it is replayed by the next instance.
    /// An empty drain file is deleted. Consuming `self` makes enqueue-after-
    /// close impossible.
    ///
    /// Failures are reported through the diagnostic hook; none are returned.
    pub fn close(self) {
        info!("closing queue");

        let Self {
            config,
            codec,
            fast_tx,
            fast_rx,
            overflow_tx,
            writer,
            scheduler,
            reader,
        } = self;

        // Start the shutdown cascade; the frontend's fast-path sender must
        // go too, or the drain below would never observe a closed channel.
        drop(overflow_tx);
        drop(fast_tx);

        let path = drain_file_path(&config.dir, &config.prefix);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(source) => {
                // In-flight elements are lost; release the receiver so the
                // workers can wind down instead of blocking on a full
                // buffer nobody drains.
                config.report(&QueueError::CreateBatch { path, source });
                drop(fast_rx);
                return;
            }
        };

        let mut out = BufWriter::new(file);
        let mut drained = 0usize;
        for element in &fast_rx {
            if let Err(source) = codec.encode(&element, &mut out) {
                config.report(&QueueError::Encode { source });
            }
            drained += 1;
        }
        if let Err(source) = out.flush() {
            config.report(&QueueError::SealBatch {
                path: path.clone(),
                source,
            });
        }
        drop(out);

        // The drain loop ended, so every worker has already exited.
        for (name, handle) in [
            ("writer", writer),
            ("scheduler", scheduler),
            ("reader", reader),
        ] {
            if handle.join().is_err() {
                config.report(&QueueError::WorkerPanicked { name });
            }
        }

        if drained == 0 {
            let _ = std::fs::remove_file(&path);
            debug!("nothing in flight; drain file removed");
        } else {
            info!(drained, path = %path.display(), "drained in-flight elements");
        }

        info!("queue closed");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{QueueBuilder, codec::BincodeCodec};

    #[test]
    fn test_construction_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("spill");

        let queue = QueueBuilder::new(&dir, "t")
            .build(BincodeCodec::<u32>::default())
            .unwrap();
        assert!(dir.is_dir());
        queue.close();
    }

    #[test]
    fn test_close_on_empty_queue_leaves_no_files() {
        let temp_dir = TempDir::new().unwrap();

        let queue = QueueBuilder::new(temp_dir.path(), "t")
            .build(BincodeCodec::<u32>::default())
            .unwrap();
        queue.close();

        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_dequeue_stream_terminates_after_close() {
        let temp_dir = TempDir::new().unwrap();

        let queue = QueueBuilder::new(temp_dir.path(), "t")
            .build(BincodeCodec::<u32>::default())
            .unwrap();
        let rx = queue.dequeue();
        queue.enqueue(7);

        assert_eq!(rx.recv().unwrap(), 7);
        queue.close();
        assert!(rx.recv().is_err());
    }
}
