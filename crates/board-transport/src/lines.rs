/// Buffers raw reads and emits one chunk per completed line.
///
/// The device talks in newline-delimited responses, but the transport
/// hands us arbitrary read chunks. This splitter re-assembles them.
/// NOTE: Mixed line endings (CRLF vs LF) in a streaming setting can be
/// tricky. `\n` is the delimiter; a preceding `\r` is left in place.
/// The splitter preserves bytes; consumers interpret.
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Feed a chunk; returns every line completed by it (delimiter
    /// included), in arrival order. Incomplete tails stay buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();

        for &b in bytes {
            self.buffer.push(b);
            if b == b'\n' {
                lines.push(std::mem::take(&mut self.buffer));
            }
        }

        lines
    }

    /// Discard any buffered partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}
