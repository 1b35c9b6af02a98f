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

//! Sealed-file hand-off between the writer and the reader.
//!
//! The scheduler holds at most one "next to deliver" filename. Filenames
//! arriving while that offer is outstanding go to a FIFO backlog; whenever
//! the offer is taken, the oldest backlog entry is promoted. This decouples
//! the writer's file-production rate from the reader's consumption rate
//! while keeping file order intact end-to-end.
//!
//! [`HandoffState`] carries the two pieces of state and is free of I/O so it
//! can be tested in isolation; [`run`] drives it between the two channels.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use crossbeam::{
    channel::{Receiver, Sender},
    select,
};
use tracing::{debug, info};

/// Delivery state: the current offer plus everything queued behind it.
#[derive(Debug, Default)]
pub(crate) struct HandoffState {
    current: Option<PathBuf>,
    backlog: VecDeque<PathBuf>,
}

impl HandoffState {
    pub(crate) fn new() -> Self { Self::default() }

    /// Accept a freshly sealed filename, preserving arrival order.
    pub(crate) fn accept(&mut self, path: PathBuf) {
        if self.current.is_none() {
            self.current = Some(path);
        } else {
            self.backlog.push_back(path);
        }
    }

    /// The filename currently offered to the reader, if any.
    pub(crate) fn offered(&self) -> Option<&Path> { self.current.as_deref() }

    /// Mark the current offer as taken and promote the oldest backlog entry.
    pub(crate) fn delivered(&mut self) {
        self.current = self.backlog.pop_front();
    }

    /// True once there is nothing left to deliver.
    pub(crate) fn is_drained(&self) -> bool {
        self.current.is_none() && self.backlog.is_empty()
    }

    /// Number of filenames held (offer plus backlog).
    pub(crate) fn len(&self) -> usize {
        usize::from(self.current.is_some()) + self.backlog.len()
    }
}

/// Scheduler worker loop.
///
/// Accepts filenames from `sealed_rx` as long as upstream is open, offers
/// the head of the queue to `deliver_tx` whenever one is present, and exits
/// once upstream has closed and the state is drained. Dropping `deliver_tx`
/// on exit tells the reader that nothing more will arrive.
pub(crate) fn run(sealed_rx: &Receiver<PathBuf>, deliver_tx: &Sender<PathBuf>) {
    let mut state = HandoffState::new();
    let mut upstream_open = true;

    loop {
        let offer = state.offered().map(Path::to_path_buf);
        match offer {
            Some(next) if upstream_open => {
                select! {
                    recv(sealed_rx) -> msg => match msg {
                        Ok(path) => {
                            state.accept(path);
                            debug!(pending = state.len(), "queued sealed batch file");
                        }
                        Err(_) => upstream_open = false,
                    },
                    send(deliver_tx, next) -> delivered => {
                        if delivered.is_err() {
                            info!("reader stopped; scheduler exiting");
                            return;
                        }
                        state.delivered();
                    }
                }
            }
            Some(next) => {
                if deliver_tx.send(next).is_err() {
                    info!("reader stopped; scheduler exiting");
                    return;
                }
                state.delivered();
            }
            None if upstream_open => match sealed_rx.recv() {
                Ok(path) => state.accept(path),
                Err(_) => upstream_open = false,
            },
            None => break,
        }
    }

    debug_assert!(state.is_drained());
    info!("scheduler drained");
}
