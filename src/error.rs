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

use std::{io, path::PathBuf};

use snafu::Snafu;

/// Queue operation failures.
///
/// Construction (`QueueBuilder::build`) returns these directly. Everything
/// that fails after construction is reported through the configured
/// diagnostic hook instead; `enqueue`, `dequeue` and `close` never return an
/// error to the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum QueueError {
    /// The spill directory could not be created.
    #[snafu(display("failed to create spill directory {}: {source}", path.display()))]
    CreateDir { path: PathBuf, source: io::Error },

    /// The spill directory could not be scanned for leftover batch files.
    #[snafu(display("failed to scan spill directory {}: {source}", path.display()))]
    ScanDir { path: PathBuf, source: io::Error },

    /// A worker thread could not be spawned.
    #[snafu(display("failed to spawn {name} thread: {source}"))]
    Spawn {
        name:   &'static str,
        source: io::Error,
    },

    /// A new batch file (or the shutdown drain file) could not be created.
    #[snafu(display("failed to create batch file {}: {source}", path.display()))]
    CreateBatch { path: PathBuf, source: io::Error },

    /// A sealed batch file could not be opened for replay.
    #[snafu(display("failed to open batch file {}: {source}", path.display()))]
    OpenBatch { path: PathBuf, source: io::Error },

    /// Sealing a batch file failed while flushing buffered records.
    #[snafu(display("failed to seal batch file {}: {source}", path.display()))]
    SealBatch { path: PathBuf, source: io::Error },

    /// An element could not be encoded; the element is dropped.
    #[snafu(display("failed to encode element: {source}"))]
    Encode { source: CodecError },

    /// A record could not be decoded; the rest of the file is abandoned.
    #[snafu(display("failed to decode element from {}: {source}", path.display()))]
    Decode {
        path:   PathBuf,
        source: CodecError,
    },

    /// A worker thread panicked and could not be joined cleanly.
    #[snafu(display("queue worker thread {name} panicked"))]
    WorkerPanicked { name: &'static str },
}

/// Element encode/decode failures.
///
/// Clean end-of-stream is not an error: [`Codec::decode`](crate::Codec::decode)
/// signals it by returning `Ok(None)`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum CodecError {
    /// Underlying I/O failure while reading or writing a record.
    #[snafu(display("I/O error: {source}"))]
    Io { source: io::Error },

    /// The element could not be serialized.
    #[snafu(display("serialization failed: {message}"))]
    Serialize { message: String },

    /// The record payload could not be deserialized.
    #[snafu(display("deserialization failed: {message}"))]
    Deserialize { message: String },

    /// The record ends before its declared length.
    #[snafu(display("truncated record"))]
    Truncated,

    /// The stored checksum does not match the record contents.
    #[snafu(display("record checksum mismatch"))]
    ChecksumMismatch,

    /// The record header declares an implausible payload length.
    #[snafu(display("record length {length} exceeds the {limit} byte limit"))]
    OversizedRecord { length: u32, limit: u32 },
}

/// Result type for queue operations.
pub type Result<T, E = QueueError> = std::result::Result<T, E>;
