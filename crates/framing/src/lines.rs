/// Buffers input and emits a record whenever `\n` is encountered.
///
/// The terminator is not part of the record. A `\r` immediately before the
/// `\n` is dropped as well, so both `ok\n` and `ok\r\n` yield `ok`. Bytes after
/// the last newline stay buffered until the next push.
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Ingest a chunk and return every record it completed, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut records = Vec::new();

        for &b in bytes {
            if b == b'\n' {
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop();
                }
                records.push(std::mem::take(&mut self.buffer));
            } else {
                self.buffer.push(b);
            }
        }

        records
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
