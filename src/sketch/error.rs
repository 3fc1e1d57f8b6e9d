//! Sketch errors - explicit failures for bad sizing and corrupt snapshots

/// Error returned by sketch construction and snapshot decoding
#[derive(Debug)]
pub enum SketchError {
    /// epsilon/delta (or explicit dimensions) outside their valid range
    InvalidParameters(String),
    /// Snapshot bytes could not be decoded
    Snapshot(SnapshotError),
}

impl std::fmt::Display for SketchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SketchError::InvalidParameters(msg) => write!(f, "Invalid sketch parameters: {}", msg),
            SketchError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
        }
    }
}

impl std::error::Error for SketchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SketchError::Snapshot(e) => Some(e),
            SketchError::InvalidParameters(_) => None,
        }
    }
}

impl From<SnapshotError> for SketchError {
    fn from(e: SnapshotError) -> Self {
        SketchError::Snapshot(e)
    }
}

/// Error type for snapshot encoding/decoding
#[derive(Debug)]
pub enum SnapshotError {
    /// Leading magic bytes are not "CMLS"
    InvalidMagic([u8; 4]),
    /// Format version this build cannot read
    UnsupportedVersion(u8),
    /// Input ended before the declared layout
    Truncated { needed: usize, available: usize },
    /// Header or payload checksum mismatch
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Payload (de)serialization failure
    Encoding(String),
    /// Header dimensions disagree with the payload or are out of range
    DimensionMismatch(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::InvalidMagic(magic) => {
                write!(f, "Invalid magic: expected CMLS, got {:?}", magic)
            }
            SnapshotError::UnsupportedVersion(v) => write!(f, "Unsupported version: {}", v),
            SnapshotError::Truncated { needed, available } => {
                write!(f, "Truncated snapshot: need {} bytes, have {}", needed, available)
            }
            SnapshotError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "Checksum mismatch: expected {:08x}, got {:08x}",
                    expected, actual
                )
            }
            SnapshotError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            SnapshotError::DimensionMismatch(msg) => write!(f, "Dimension mismatch: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<bincode::Error> for SnapshotError {
    fn from(e: bincode::Error) -> Self {
        SnapshotError::Encoding(e.to_string())
    }
}
