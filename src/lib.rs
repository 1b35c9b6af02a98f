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

//! In-process bounded queue with disk-based overflow.
//!
//! Elements flow through a fixed-capacity in-memory buffer while the
//! consumer keeps up. When the buffer is full, elements divert to a disk
//! pipeline: spilled into timestamped batch files, scheduled in order, and
//! replayed into the buffer as room appears. Bursts never exceed the
//! memory budget and are never silently dropped. Files left over from a
//! previous run (including the shutdown drain) are replayed on startup.
//!
//! Element order is preserved within the fast path and within the disk
//! path, but not across the two.
//!
//! ## Usage
//!
//! ```ignore
//! let queue = QueueBuilder::new("/mnt/queues", "demo")
//!     .buffer_size(100)
//!     .build(BincodeCodec::<String>::default())?;
//!
//! let rx = queue.dequeue();
//! std::thread::spawn(move || {
//!     for element in rx {
//!         println!("we got: {element}");
//!     }
//! });
//!
//! queue.enqueue("aap".to_string());
//! queue.enqueue("noot".to_string());
//! queue.close();
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod error;
mod path;
mod queue;
mod reader;
mod scheduler;
mod writer;

pub use builder::QueueBuilder;
pub use codec::{BincodeCodec, Codec};
pub use config::{DEFAULT_BUFFER_SIZE, DEFAULT_TIMEOUT, DiagnosticHook, QueueConfig};
pub use error::{CodecError, QueueError, Result};
pub use queue::Queue;
