//! # Processed-Timestamp Encoding
//!
//! Stored value: 8-byte big-endian nanoseconds since the Unix epoch.

/// Width of an encoded timestamp.
pub const MARK_LEN: usize = 8;

/// Codec for the dedup store value.
pub struct ProcessedMarks;

impl ProcessedMarks {
    pub fn encode(nanos: u64) -> [u8; MARK_LEN] {
        nanos.to_be_bytes()
    }

    /// Decode a stored value. Wrong-length and zero values decode to `None`,
    /// which callers treat as never processed.
    pub fn decode(raw: &[u8]) -> Option<u64> {
        let bytes: [u8; MARK_LEN] = raw.try_into().ok()?;
        match u64::from_be_bytes(bytes) {
            0 => None,
            nanos => Some(nanos),
        }
    }
}
