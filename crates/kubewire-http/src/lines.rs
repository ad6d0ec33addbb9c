use bytes::{Bytes, BytesMut};

/// Reassembles newline-delimited records from arbitrarily split chunks
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: BytesMut,
    /// Bytes already known not to contain a newline
    scanned: usize,
}

impl LineBuffer {
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete, non-blank line without its terminator
    pub fn next_line(&mut self) -> Option<Bytes> {
        loop {
            let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buf.len();
                return None;
            };

            let mut line = self.buf.split_to(self.scanned + offset + 1);
            self.scanned = 0;

            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            return Some(line.freeze());
        }
    }

    /// Bytes of the incomplete trailing line
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}
