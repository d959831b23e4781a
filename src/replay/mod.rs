//! Replay segment codec (§6): the core depends only on this module's frame
//! semantics, not on a full replay orchestrator — segment/frame encode,
//! decode, and CRC validation only. Gated behind the `journal` feature,
//! mirroring the teacher's own feature of the same name.

mod error;
mod format;
mod segment;

pub use error::ReplayError;
pub use format::{
    crc32, BookLevel, BookRecordHeader, CompressedBlockHeader, FrameHeader, FrameType, IndexEntry, IndexHeader,
    SegmentHeader, BLOCK_MAGIC, INDEX_MAGIC, SEGMENT_MAGIC, SEGMENT_VERSION,
};
pub use segment::{DecodedFrame, SegmentFrameIter, SegmentReader, SegmentWriter};
