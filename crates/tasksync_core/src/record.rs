//! On-disk record envelope shared by version logs and snapshot files.
//!
//! ```text
//! | magic (4) | format (2) | kind (1) | length (4) | body (N) | crc32 (4) |
//! ```
//!
//! Integers are little-endian. The CRC covers header and body.
//!
//! Bodies:
//!
//! ```text
//! version:  | version (8) | parent (8) | committed_at_ms (8) | payload |
//! snapshot: | version (8) | stored_at_ms (8) | payload |
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, Snapshot, VersionId};
use bytes::Bytes;
use tasksync_storage::LogBackend;

/// Magic bytes opening every record.
pub const RECORD_MAGIC: [u8; 4] = *b"TSYN";

/// Current record format.
pub const RECORD_FORMAT: u16 = 1;

/// magic (4) + format (2) + kind (1) + length (4)
const HEADER_SIZE: usize = 11;
const CRC_SIZE: usize = 4;

/// Kind byte of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    /// A committed history segment.
    Version = 1,
    /// A client snapshot.
    Snapshot = 2,
}

impl RecordKind {
    /// Converts a byte to a record kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Version),
            2 => Some(Self::Snapshot),
            _ => None,
        }
    }

    /// Converts the kind to its byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    const fn fixed_body_len(self) -> usize {
        match self {
            Self::Version => 24,
            Self::Snapshot => 16,
        }
    }
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A committed history segment.
    Version(Batch),
    /// A client snapshot.
    Snapshot(Snapshot),
}

/// Result of reading at an offset of a log.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// A complete, verified record and its encoded length.
    Record { record: Record, len: u64 },
    /// Fewer bytes remain than the record needs: a write torn by a crash.
    Torn,
    /// The offset is exactly the end of the log.
    End,
}

impl Record {
    /// Returns the record kind.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Version(_) => RecordKind::Version,
            Self::Snapshot(_) => RecordKind::Snapshot,
        }
    }

    /// Encodes the record with its envelope.
    ///
    /// # Errors
    ///
    /// Fails if the body does not fit the 4-byte length field.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let kind = self.kind();
        let payload = match self {
            Self::Version(b) => &b.payload,
            Self::Snapshot(s) => &s.payload,
        };
        let body_len = u32::try_from(kind.fixed_body_len() + payload.len()).map_err(|_| {
            CoreError::PayloadTooLarge {
                size: payload.len(),
                max: u32::MAX as usize - kind.fixed_body_len(),
            }
        })?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + body_len as usize + CRC_SIZE);
        buf.extend_from_slice(&RECORD_MAGIC);
        buf.extend_from_slice(&RECORD_FORMAT.to_le_bytes());
        buf.push(kind.as_byte());
        buf.extend_from_slice(&body_len.to_le_bytes());

        match self {
            Self::Version(b) => {
                buf.extend_from_slice(&b.version.as_u64().to_le_bytes());
                buf.extend_from_slice(&b.parent.as_u64().to_le_bytes());
                buf.extend_from_slice(&b.committed_at_ms.to_le_bytes());
            }
            Self::Snapshot(s) => {
                buf.extend_from_slice(&s.version.as_u64().to_le_bytes());
                buf.extend_from_slice(&s.stored_at_ms.to_le_bytes());
            }
        }
        buf.extend_from_slice(payload);

        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decodes exactly one record occupying all of `bytes`.
    ///
    /// Unlike log recovery, a short buffer here is corruption, not a torn
    /// write.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::corruption(format!(
                "record of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        let (_, body_len) = parse_header(&bytes[..HEADER_SIZE], 0)?;
        let total = HEADER_SIZE + body_len + CRC_SIZE;
        if bytes.len() != total {
            return Err(CoreError::corruption(format!(
                "record length mismatch: header says {total} bytes, have {}",
                bytes.len()
            )));
        }
        decode_verified(bytes)
    }

    /// Reads the record starting at `offset`.
    pub(crate) fn read_from(backend: &dyn LogBackend, offset: u64) -> CoreResult<ReadOutcome> {
        let size = backend.size()?;
        if offset == size {
            return Ok(ReadOutcome::End);
        }
        let remaining = size.saturating_sub(offset);
        if remaining < HEADER_SIZE as u64 {
            return Ok(ReadOutcome::Torn);
        }

        let header = backend.read_at(offset, HEADER_SIZE)?;
        let (_, body_len) = parse_header(&header, offset)?;
        let total = (HEADER_SIZE + body_len + CRC_SIZE) as u64;
        if remaining < total {
            return Ok(ReadOutcome::Torn);
        }

        let bytes = backend.read_at(offset, total as usize)?;
        let record = decode_verified(&bytes)?;
        Ok(ReadOutcome::Record { record, len: total })
    }
}

fn parse_header(header: &[u8], offset: u64) -> CoreResult<(RecordKind, usize)> {
    if header[0..4] != RECORD_MAGIC {
        return Err(CoreError::corruption(format!(
            "invalid magic at offset {offset}"
        )));
    }
    let format = u16::from_le_bytes([header[4], header[5]]);
    if format > RECORD_FORMAT {
        return Err(CoreError::corruption(format!(
            "unsupported record format {format} at offset {offset}"
        )));
    }
    let kind = RecordKind::from_byte(header[6]).ok_or_else(|| {
        CoreError::corruption(format!(
            "unknown record kind {} at offset {offset}",
            header[6]
        ))
    })?;
    let body_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
    if body_len < kind.fixed_body_len() {
        return Err(CoreError::corruption(format!(
            "{kind:?} record body of {body_len} bytes at offset {offset} is too short"
        )));
    }
    Ok((kind, body_len))
}

/// Checks the CRC of a complete record and decodes its body.
fn decode_verified(bytes: &[u8]) -> CoreResult<Record> {
    let crc_start = bytes.len() - CRC_SIZE;
    let stored = u32::from_le_bytes([
        bytes[crc_start],
        bytes[crc_start + 1],
        bytes[crc_start + 2],
        bytes[crc_start + 3],
    ]);
    let computed = compute_crc32(&bytes[..crc_start]);
    if stored != computed {
        return Err(CoreError::ChecksumMismatch {
            expected: stored,
            actual: computed,
        });
    }

    let (kind, _) = parse_header(&bytes[..HEADER_SIZE], 0)?;
    let body = &bytes[HEADER_SIZE..crc_start];
    let word = |i: usize| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&body[i * 8..i * 8 + 8]);
        u64::from_le_bytes(raw)
    };

    let payload = Bytes::copy_from_slice(&body[kind.fixed_body_len()..]);
    Ok(match kind {
        RecordKind::Version => Record::Version(Batch {
            version: VersionId::new(word(0)),
            parent: VersionId::new(word(1)),
            committed_at_ms: word(2),
            payload,
        }),
        RecordKind::Snapshot => Record::Snapshot(Snapshot {
            version: VersionId::new(word(0)),
            stored_at_ms: word(1),
            payload,
        }),
    })
}

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC32 (IEEE polynomial).
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    !data.iter().fold(0xFFFF_FFFF_u32, |crc, &byte| {
        (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize]
    })
}
