//! Errors for the replay segment codec (§7).

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("segment I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A frame's stored CRC32 did not match the payload's computed CRC32.
    /// Disposition (§7): the frame is dropped, an error counter is
    /// incremented, decoding continues at the next frame.
    #[error("CRC mismatch at frame offset {frame_offset}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        frame_offset: u64,
        expected: u32,
        actual: u32,
    },
    #[error("bad segment magic")]
    BadMagic,
    #[error("unsupported segment version {version}")]
    UnsupportedVersion { version: u16 },
    #[error("segment truncated")]
    Truncated,
}
