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

//! Element serialization for batch files.
//!
//! The queue never inspects element contents; it moves them through a
//! [`Codec`] bound at construction. A batch file is a back-to-back sequence
//! of records produced by that codec, and end of valid data is a clean
//! end-of-stream signal (`Ok(None)` from [`Codec::decode`]), distinguishable
//! from a genuine decode error.
//!
//! ## On-disk record format of [`BincodeCodec`]
//!
//! ```text
//! ┌─────────────────┬──────────────────────┬─────────────────┐
//! │  Length (4B)    │   Payload (variable) │   CRC32 (4B)    │
//! │  little-endian  │   bincode bytes      │   little-endian │
//! └─────────────────┴──────────────────────┴─────────────────┘
//! ```
//!
//! The CRC covers both the length field and the payload, so a truncated or
//! overwritten tail is detected before deserialization is attempted.

use std::{
    io::{self, Read, Write},
    marker::PhantomData,
};

use crc32fast::Hasher;
use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, ensure};

use crate::error::{
    ChecksumMismatchSnafu, CodecError, DeserializeSnafu, IoSnafu, OversizedRecordSnafu,
    SerializeSnafu, TruncatedSnafu,
};

/// Size of the record length prefix in bytes.
pub(crate) const RECORD_LENGTH_SIZE: usize = 4;

/// Size of the record checksum in bytes.
pub(crate) const RECORD_CRC_SIZE: usize = 4;

/// Upper bound on a single record's payload. A length field above this is
/// treated as corruption rather than allocated.
pub(crate) const RECORD_SIZE_LIMIT: u32 = 256 * 1024 * 1024;

/// Serialize/deserialize capability for queue elements.
///
/// Implementations must produce self-describing records: `decode` consumes
/// exactly one record from the stream, returns `Ok(None)` when the stream
/// ends cleanly at a record boundary, and returns an error for anything
/// else (truncation, corruption, I/O failure).
pub trait Codec: Send + Sync + 'static {
    /// The element type moved through the queue.
    type Item: Send + 'static;

    /// Append one element as a single record.
    fn encode<W: Write>(&self, item: &Self::Item, out: &mut W) -> Result<(), CodecError>;

    /// Read the next record, or `Ok(None)` at clean end-of-stream.
    fn decode<R: Read>(&self, input: &mut R) -> Result<Option<Self::Item>, CodecError>;
}

/// Default codec: serde + bincode payloads in length/CRC framed records.
pub struct BincodeCodec<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self { Self { _item: PhantomData } }
}

impl<T> Codec for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Item = T;

    fn encode<W: Write>(&self, item: &Self::Item, out: &mut W) -> Result<(), CodecError> {
        let payload = bincode::serde::encode_to_vec(item, bincode::config::standard())
            .map_err(|e| SerializeSnafu { message: e.to_string() }.build())?;

        ensure!(
            payload.len() <= RECORD_SIZE_LIMIT as usize,
            OversizedRecordSnafu {
                length: u32::try_from(payload.len()).unwrap_or(u32::MAX),
                limit:  RECORD_SIZE_LIMIT,
            }
        );

        let length = payload.len() as u32;
        let crc = record_crc(length, &payload);

        out.write_all(&length.to_le_bytes()).context(IoSnafu)?;
        out.write_all(&payload).context(IoSnafu)?;
        out.write_all(&crc.to_le_bytes()).context(IoSnafu)?;
        Ok(())
    }

    fn decode<R: Read>(&self, input: &mut R) -> Result<Option<Self::Item>, CodecError> {
        let mut length_buf = [0u8; RECORD_LENGTH_SIZE];
        if !read_exact_or_eof(input, &mut length_buf)? {
            return Ok(None);
        }
        let length = u32::from_le_bytes(length_buf);

        ensure!(
            length <= RECORD_SIZE_LIMIT,
            OversizedRecordSnafu {
                length,
                limit: RECORD_SIZE_LIMIT,
            }
        );

        let mut payload = vec![0u8; length as usize];
        read_exact_record(input, &mut payload)?;

        let mut crc_buf = [0u8; RECORD_CRC_SIZE];
        read_exact_record(input, &mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);

        ensure!(
            verify_record_crc(length, &payload, stored_crc),
            ChecksumMismatchSnafu
        );

        let (item, consumed) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard())
                .map_err(|e| DeserializeSnafu { message: e.to_string() }.build())?;
        ensure!(
            consumed == payload.len(),
            DeserializeSnafu {
                message: format!("{} trailing bytes in record payload", payload.len() - consumed),
            }
        );

        Ok(Some(item))
    }
}

/// Calculate the CRC32 checksum of a record.
///
/// The checksum covers both the length prefix and the payload, so it detects
/// payload corruption, length-field corruption and truncated writes alike.
#[inline]
pub(crate) fn record_crc(length: u32, payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&length.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// Verify a record's CRC32 checksum.
#[inline]
pub(crate) fn verify_record_crc(length: u32, payload: &[u8], expected: u32) -> bool {
    record_crc(length, payload) == expected
}

/// Fill `buf` completely, or return `Ok(false)` if the stream ended before
/// the first byte. A partial fill is a truncated record.
fn read_exact_or_eof<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<bool, CodecError> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return TruncatedSnafu.fail(),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e).context(IoSnafu),
        }
    }
    Ok(true)
}

/// Fill `buf` completely; end-of-stream anywhere in it is a truncated record.
fn read_exact_record<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<(), CodecError> {
    match input.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => TruncatedSnafu.fail(),
        Err(e) => Err(e).context(IoSnafu),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn codec() -> BincodeCodec<String> { BincodeCodec::default() }

    fn encode_all(items: &[&str]) -> Vec<u8> {
        let c = codec();
        let mut buf = Vec::new();
        for item in items {
            c.encode(&(*item).to_string(), &mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn test_record_crc() {
        let payload = b"test record";
        let length = payload.len() as u32;
        let crc = record_crc(length, payload);

        assert_eq!(crc, record_crc(length, payload));
        assert_ne!(crc, record_crc(length + 1, payload));

        assert!(verify_record_crc(length, payload, crc));
        assert!(!verify_record_crc(length, payload, crc.wrapping_add(1)));
        assert!(!verify_record_crc(length, b"wrong", crc));
    }

    #[test]
    fn test_encode_decode_stream() {
        let buf = encode_all(&["aap", "noot", "mies"]);
        let mut input = Cursor::new(buf);

        let c = codec();
        assert_eq!(c.decode(&mut input).unwrap(), Some("aap".to_string()));
        assert_eq!(c.decode(&mut input).unwrap(), Some("noot".to_string()));
        assert_eq!(c.decode(&mut input).unwrap(), Some("mies".to_string()));
        assert_eq!(c.decode(&mut input).unwrap(), None);
    }

    #[test]
    fn test_empty_stream_is_clean_eof() {
        let mut input = Cursor::new(Vec::new());
        assert_eq!(codec().decode(&mut input).unwrap(), None);
    }

    #[test]
    fn test_truncated_record() {
        let mut buf = encode_all(&["truncate me"]);
        buf.truncate(buf.len() - 3);
        let mut input = Cursor::new(buf);

        let err = codec().decode(&mut input).unwrap_err();
        assert!(matches!(err, CodecError::Truncated));
    }

    #[test]
    fn test_corrupted_payload() {
        let mut buf = encode_all(&["bitflip"]);
        buf[RECORD_LENGTH_SIZE + 1] ^= 0xFF;
        let mut input = Cursor::new(buf);

        let err = codec().decode(&mut input).unwrap_err();
        assert!(matches!(err, CodecError::ChecksumMismatch));
    }

    #[test]
    fn test_oversized_length_header() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(b"junk");
        let mut input = Cursor::new(buf);

        let err = codec().decode(&mut input).unwrap_err();
        assert!(matches!(err, CodecError::OversizedRecord { .. }));
    }

    #[test]
    fn test_valid_prefix_survives_garbage_tail() {
        let mut buf = encode_all(&["one", "two"]);
        buf.extend_from_slice(&[0x13, 0x37, 0xAA, 0x55, 0x00, 0xFF]);
        let mut input = Cursor::new(buf);

        let c = codec();
        assert_eq!(c.decode(&mut input).unwrap(), Some("one".to_string()));
        assert_eq!(c.decode(&mut input).unwrap(), Some("two".to_string()));
        assert!(c.decode(&mut input).is_err());
    }
}
