//! Audio chunk value object

/// One slice of encoded audio emitted by the recorder on its cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    sequence: u32,
    offset_ms: u64,
    data: Vec<u8>,
}

impl AudioChunk {
    pub fn new(sequence: u32, offset_ms: u64, data: Vec<u8>) -> Self {
        Self {
            sequence,
            offset_ms,
            data,
        }
    }

    /// Zero-based position within the session
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Tracked recording duration at the moment the chunk was emitted
    pub fn offset_ms(&self) -> u64 {
        self.offset_ms
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
