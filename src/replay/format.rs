//! Fixed-layout on-disk frame/segment structs (§6), decoded with
//! `zerocopy` directly from a memory-mapped byte slice rather than parsed
//! field-by-field.
//!
//! The teacher's own journal (`orderbook/sequencer/file_journal.rs`) hand-
//! parses `to_le_bytes`/`from_le_bytes` against a `memmap2::Mmap`; this
//! crate instead leans on `zerocopy`, the teacher's own dependency choice
//! for its `wire` feature (see `cooprefr-bettersys`'s `edge/wire.rs` for
//! the same fixed-size, magic-prefixed, CRC-trailered frame shape this
//! module generalizes). Every struct here is laid out with explicit
//! padding fields so its `repr(C)` size exactly matches §6's byte counts
//! with no implicit padding.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const SEGMENT_MAGIC: [u8; 4] = *b"FLOX";
pub const BLOCK_MAGIC: [u8; 4] = *b"FBLK";
pub const INDEX_MAGIC: [u8; 4] = *b"INDX";

pub const SEGMENT_VERSION: u16 = 1;

/// A frame's payload kind (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Trade = 0,
    BookSnapshot = 1,
    BookDelta = 2,
}

impl FrameType {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Trade),
            1 => Some(Self::BookSnapshot),
            2 => Some(Self::BookDelta),
            _ => None,
        }
    }
}

/// 64-byte segment header (§6): `magic "FLOX", version, flags,
/// compression, counts, index-offset`.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SegmentHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub flags: u16,
    pub compression: u8,
    pub _reserved0: [u8; 3],
    pub frame_count: u32,
    pub index_offset: u64,
    pub created_ts_ns: i64,
    pub _reserved1: [u8; 32],
}

const _: () = assert!(std::mem::size_of::<SegmentHeader>() == 64);

impl SegmentHeader {
    pub fn new(created_ts_ns: i64) -> Self {
        Self {
            magic: SEGMENT_MAGIC,
            version: SEGMENT_VERSION,
            flags: 0,
            compression: 0,
            _reserved0: [0; 3],
            frame_count: 0,
            index_offset: 0,
            created_ts_ns,
            _reserved1: [0; 32],
        }
    }

    pub fn validate(&self) -> Result<(), super::error::ReplayError> {
        if self.magic != SEGMENT_MAGIC {
            return Err(super::error::ReplayError::BadMagic);
        }
        if self.version != SEGMENT_VERSION {
            return Err(super::error::ReplayError::UnsupportedVersion { version: self.version });
        }
        Ok(())
    }
}

/// Per-frame header (§6): `size, CRC32 of payload, type, rec-version`.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FrameHeader {
    pub size: u32,
    pub crc32: u32,
    pub frame_type: u8,
    pub rec_version: u8,
    pub _reserved: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<FrameHeader>() == 12);

/// A fixed 48-byte trade record (§6).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct TradeRecord {
    pub symbol_id: u32,
    pub is_buy: u32,
    pub price_raw: i64,
    pub quantity_raw: i64,
    pub trade_id: u64,
    pub exchange_ts_ns: i64,
    pub sequence: u64,
}

const _: () = assert!(std::mem::size_of::<TradeRecord>() == 48);

/// Fixed 40-byte book-record header, followed by `bid_count + ask_count`
/// [`BookLevel`] entries (§6).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct BookRecordHeader {
    pub symbol_id: u32,
    pub kind: u8,
    pub _reserved0: [u8; 3],
    pub sequence_number: u64,
    pub exchange_ts_ns: i64,
    pub recv_ts_ns: i64,
    pub bid_count: u16,
    pub ask_count: u16,
    pub _reserved1: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<BookRecordHeader>() == 40);

/// One price level inside a book record (§6): 16 bytes.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct BookLevel {
    pub price_raw: i64,
    pub quantity_raw: i64,
}

const _: () = assert!(std::mem::size_of::<BookLevel>() == 16);

/// Header for a block of frames compressed together (§6): `magic "FBLK",
/// sizes, event-count`.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct CompressedBlockHeader {
    pub magic: [u8; 4],
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub event_count: u32,
}

const _: () = assert!(std::mem::size_of::<CompressedBlockHeader>() == 16);

/// CRC-protected index header (§6): `magic "INDX"`.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct IndexHeader {
    pub magic: [u8; 4],
    pub entry_count: u32,
    pub crc32: u32,
    pub _reserved: u32,
}

const _: () = assert!(std::mem::size_of::<IndexHeader>() == 16);

/// One `(timestamp_ns, file_offset)` index entry (§6).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct IndexEntry {
    pub timestamp_ns: i64,
    pub file_offset: u64,
}

const _: () = assert!(std::mem::size_of::<IndexEntry>() == 16);

/// CRC32 (IEEE 802.3 polynomial, §6) of `payload`.
pub fn crc32(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes as _;

    #[test]
    fn segment_header_round_trips_through_bytes() {
        let header = SegmentHeader::new(1_000);
        let bytes = header.as_bytes();
        assert_eq!(bytes.len(), 64);
        let (decoded, _) = SegmentHeader::ref_from_prefix(bytes).unwrap();
        assert_eq!(decoded.magic, SEGMENT_MAGIC);
        assert_eq!(decoded.created_ts_ns, 1_000);
        decoded.validate().unwrap();
    }

    #[test]
    fn frame_type_round_trips_through_u8() {
        assert_eq!(FrameType::from_u8(0), Some(FrameType::Trade));
        assert_eq!(FrameType::from_u8(2), Some(FrameType::BookDelta));
        assert_eq!(FrameType::from_u8(99), None);
    }

    #[test]
    fn crc32_is_deterministic_and_sensitive_to_payload() {
        let a = crc32(b"hello");
        let b = crc32(b"hello");
        let c = crc32(b"hellp");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
