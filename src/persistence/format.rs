//! Binary layout of a serialized [`Index`].
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header (24B, little endian):            │
//! │   - Magic bytes (4B): "KNDX"            │
//! │   - Format version (4B)                 │
//! │   - Flags (4B), reserved, zero          │
//! │   - Payload length (8B)                 │
//! │   - CRC32 of payload (4B)               │
//! ├─────────────────────────────────────────┤
//! │ Payload (postcard):                     │
//! │   - titles: [varint len, utf8]*         │
//! │   - neighbors: per item                 │
//! │       varint count,                     │
//! │       (varint index, f16 score)*        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Neighbor indices are varints, so most entries take 2-3 bytes plus 2 for
//! the score. Decoding checks the header, the length, the checksum, that the
//! payload is consumed exactly, and finally the [`Index`] invariants.

use super::error::{PersistenceError, PersistenceResult};
use crate::compact::NeighborList;
use crate::index::Index;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Magic bytes at offset 0.
pub const INDEX_MAGIC: &[u8; 4] = b"KNDX";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Fixed header preceding the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub flags: u32,
    pub payload_len: u64,
    pub checksum: u32,
}

impl IndexHeader {
    /// 4 (magic) + 4 (version) + 4 (flags) + 8 (length) + 4 (crc) = 24
    pub const SERIALIZED_SIZE: usize = 24;

    fn for_payload(payload: &[u8]) -> Self {
        Self {
            magic: *INDEX_MAGIC,
            format_version: FORMAT_VERSION,
            flags: 0,
            payload_len: payload.len() as u64,
            checksum: crc32fast::hash(payload),
        }
    }

    /// Read a header from a reader.
    pub fn read<R: Read>(reader: &mut R) -> PersistenceResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        let mut u32_buf = [0u8; 4];
        reader.read_exact(&mut u32_buf)?;
        let format_version = u32::from_le_bytes(u32_buf);

        reader.read_exact(&mut u32_buf)?;
        let flags = u32::from_le_bytes(u32_buf);

        let mut u64_buf = [0u8; 8];
        reader.read_exact(&mut u64_buf)?;
        let payload_len = u64::from_le_bytes(u64_buf);

        reader.read_exact(&mut u32_buf)?;
        let checksum = u32::from_le_bytes(u32_buf);

        Ok(Self {
            magic,
            format_version,
            flags,
            payload_len,
            checksum,
        })
    }

    /// Write a header to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> PersistenceResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.format_version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.payload_len.to_le_bytes())?;
        writer.write_all(&self.checksum.to_le_bytes())?;
        Ok(())
    }

    /// Reject headers this build cannot decode.
    pub fn check(&self) -> PersistenceResult<()> {
        if &self.magic != INDEX_MAGIC {
            return Err(PersistenceError::BadMagic);
        }
        if self.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.format_version));
        }
        if self.flags != 0 {
            return Err(PersistenceError::UnsupportedFlags(self.flags));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    titles: &'a [String],
    neighbors: &'a [NeighborList],
}

#[derive(Deserialize)]
struct Payload {
    titles: Vec<String>,
    neighbors: Vec<NeighborList>,
}

/// Encode an index.
pub fn serialize(index: &Index) -> PersistenceResult<Vec<u8>> {
    let payload = postcard::to_allocvec(&PayloadRef {
        titles: index.titles(),
        neighbors: index.neighbor_lists(),
    })
    .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(IndexHeader::SERIALIZED_SIZE + payload.len());
    IndexHeader::for_payload(&payload).write(&mut out)?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode and validate an index.
pub fn deserialize(bytes: &[u8]) -> PersistenceResult<Index> {
    if bytes.len() < IndexHeader::SERIALIZED_SIZE {
        if bytes.len() >= INDEX_MAGIC.len() && &bytes[..INDEX_MAGIC.len()] != INDEX_MAGIC {
            return Err(PersistenceError::BadMagic);
        }
        return Err(PersistenceError::Truncated {
            needed: IndexHeader::SERIALIZED_SIZE,
            available: bytes.len(),
        });
    }

    let mut cursor = bytes;
    let header = IndexHeader::read(&mut cursor)?;
    header.check()?;

    let available = cursor.len();
    let payload_len = usize::try_from(header.payload_len).map_err(|_| {
        PersistenceError::Invariant(format!("payload length {} too large", header.payload_len))
    })?;
    if available < payload_len {
        return Err(PersistenceError::Truncated {
            needed: IndexHeader::SERIALIZED_SIZE + payload_len,
            available: bytes.len(),
        });
    }
    if available > payload_len {
        return Err(PersistenceError::Deserialization(format!(
            "{} trailing bytes after payload",
            available - payload_len
        )));
    }

    let actual = crc32fast::hash(cursor);
    if actual != header.checksum {
        return Err(PersistenceError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let (payload, rest): (Payload, &[u8]) = postcard::take_from_bytes(cursor)?;
    if !rest.is_empty() {
        return Err(PersistenceError::Deserialization(format!(
            "{} unread payload bytes",
            rest.len()
        )));
    }

    Index::new(payload.titles, payload.neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::Neighbor;
    use half::f16;

    fn sample() -> Index {
        let nb = |index, score: f32| Neighbor {
            index,
            score: f16::from_f32(score),
        };
        Index::new(
            vec!["The Matrix".into(), "Matrix Reloaded".into(), "Inception".into()],
            vec![
                NeighborList::from_ranked(vec![nb(1, 0.8), nb(2, 0.25)]),
                NeighborList::from_ranked(vec![nb(0, 0.8), nb(2, 0.0)]),
                NeighborList::from_ranked(vec![nb(0, 0.25), nb(1, 0.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn header_roundtrip() {
        let header = IndexHeader::for_payload(b"abc");
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), IndexHeader::SERIALIZED_SIZE);
        assert_eq!(IndexHeader::read(&mut buf.as_slice()).unwrap(), header);
    }

    #[test]
    fn roundtrip_is_exact() {
        let index = sample();
        let bytes = serialize(&index).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), index);
    }

    #[test]
    fn rejects_truncation_everywhere() {
        let bytes = serialize(&sample()).unwrap();
        for cut in 0..bytes.len() {
            assert!(deserialize(&bytes[..cut]).is_err(), "accepted prefix of {cut} bytes");
        }
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut bytes = serialize(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(deserialize(&bytes), Err(PersistenceError::BadMagic)));

        let mut bytes = serialize(&sample()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            deserialize(&bytes),
            Err(PersistenceError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn rejects_unknown_flags() {
        let mut bytes = serialize(&sample()).unwrap();
        bytes[8] = 1;
        assert!(matches!(
            deserialize(&bytes),
            Err(PersistenceError::UnsupportedFlags(1))
        ));
    }

    #[test]
    fn rejects_flipped_payload_bit() {
        let mut bytes = serialize(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            deserialize(&bytes),
            Err(PersistenceError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = serialize(&sample()).unwrap();
        bytes.push(0);
        assert!(deserialize(&bytes).is_err());
    }

    /// Encode parts without going through `Index::new`.
    fn encode_raw(titles: &[String], neighbors: &[NeighborList]) -> Vec<u8> {
        let payload = postcard::to_allocvec(&PayloadRef { titles, neighbors }).unwrap();
        let mut bytes = Vec::new();
        IndexHeader::for_payload(&payload).write(&mut bytes).unwrap();
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn rejects_invariant_violations_with_valid_checksum() {
        // well-formed bytes whose neighbor index points past N
        let titles = vec!["a".to_string(), "b".to_string()];
        let neighbors = vec![
            NeighborList::from_ranked(vec![Neighbor {
                index: 7,
                score: f16::from_f32(0.5),
            }]),
            NeighborList::default(),
        ];
        let bytes = encode_raw(&titles, &neighbors);
        assert!(matches!(deserialize(&bytes), Err(PersistenceError::Invariant(_))));

        // titles/neighbors length mismatch
        let bytes = encode_raw(&titles, &[]);
        assert!(matches!(deserialize(&bytes), Err(PersistenceError::Invariant(_))));

        // empty title
        let titles = vec![String::new(), "b".to_string()];
        let neighbors = vec![NeighborList::default(), NeighborList::default()];
        let bytes = encode_raw(&titles, &neighbors);
        assert!(matches!(deserialize(&bytes), Err(PersistenceError::Invariant(_))));
    }

    #[test]
    fn large_k_decodes_in_linear_time() {
        // every item lists all others, so K = N - 1
        let n: u32 = 2_000;
        let neighbors: Vec<NeighborList> = (0..n)
            .map(|item| {
                NeighborList::from_ranked(
                    (0..n)
                        .filter(|&j| j != item)
                        .map(|index| Neighbor {
                            index,
                            score: f16::ONE,
                        })
                        .collect(),
                )
            })
            .collect();
        let titles = (0..n).map(|i| format!("Title {i}")).collect();
        let index = Index::new(titles, neighbors).unwrap();

        let bytes = serialize(&index).unwrap();
        let start = std::time::Instant::now();
        let decoded = deserialize(&bytes).unwrap();
        let elapsed = start.elapsed();
        assert_eq!(decoded.stats().max_neighbors, n as usize - 1);
        assert_eq!(decoded, index);
        // quadratic duplicate checks took seconds here even in release
        assert!(elapsed.as_secs() < 30, "decode took {elapsed:?}");
    }
}
