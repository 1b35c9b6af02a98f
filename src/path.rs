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

//! Batch-file naming and the startup directory scan.
//!
//! A batch file is named `<prefix>-<timestamp>.spill` with a fixed-width,
//! zero-padded UTC timestamp at nanosecond precision, so lexicographic order
//! equals chronological order. One reserved name, derived from the Unix
//! epoch, is written only by the shutdown drain; it sorts ahead of every
//! file produced while the queue was live.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use snafu::ResultExt;
use tracing::debug;

use crate::{Result, error::ScanDirSnafu};

/// Extension shared by every batch file.
pub(crate) const BATCH_EXTENSION: &str = ".spill";

/// Fixed-width, lexically sortable timestamp layout.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.9f";

/// Generates a batch file name: `<prefix>-<timestamp>.spill`.
pub(crate) fn batch_file_name(prefix: &str, time: DateTime<Utc>) -> String {
    format!(
        "{prefix}-{}{BATCH_EXTENSION}",
        time.format(TIMESTAMP_FORMAT)
    )
}

/// Returns the full path of a batch file for the given creation time.
pub(crate) fn batch_file_path<P: AsRef<Path>>(
    dir: P,
    prefix: &str,
    time: DateTime<Utc>,
) -> PathBuf {
    dir.as_ref().join(batch_file_name(prefix, time))
}

/// Returns the reserved shutdown-drain path (zero-value timestamp).
pub(crate) fn drain_file_path<P: AsRef<Path>>(dir: P, prefix: &str) -> PathBuf {
    batch_file_path(dir, prefix, DateTime::UNIX_EPOCH)
}

/// Parses the creation timestamp out of a batch file name.
///
/// Returns `None` when the name does not belong to this queue's
/// (prefix, extension) family or its timestamp is malformed.
pub(crate) fn batch_timestamp(name: &str, prefix: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(BATCH_EXTENSION)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// Lists leftover batch files for `(dir, prefix)` in chronological order.
///
/// Single pass over the directory; entries whose name does not parse as a
/// batch file are skipped. Lexicographic sort is chronological because the
/// timestamp is fixed-width.
pub(crate) fn scan_batch_files<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir).context(ScanDirSnafu { path: dir })? {
        let entry = entry.context(ScanDirSnafu { path: dir })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if batch_timestamp(name, prefix).is_some() {
            files.push(entry.path());
        } else {
            debug!(name, "skipping non-batch directory entry");
        }
    }

    files.sort();
    Ok(files)
}
