//! Incremental newline framing for server stdout.

use tracing::warn;

/// Buffer size above which a warning is logged.
pub const WARN_THRESHOLD_BYTES: usize = 512 * 1024;
/// Buffer size above which the incomplete remainder is discarded.
pub const HARD_CAP_BYTES: usize = 1024 * 1024;

/// Reassembles newline-delimited messages from arbitrary-sized chunks.
///
/// Complete lines are always extracted before anything is discarded, so an
/// overflow only ever loses the incomplete tail.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    warned: bool,
    /// Set after an overflow: drop bytes up to the next newline, which
    /// belong to the message that was cut.
    resync: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every complete, non-blank line in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let chunk = if self.resync {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.resync = false;
                    &chunk[pos + 1..]
                }
                None => return Vec::new(),
            }
        } else {
            chunk
        };

        self.buf.extend_from_slice(chunk);
        let overflow = self.buf.len() > HARD_CAP_BYTES;

        if !overflow && self.buf.len() > WARN_THRESHOLD_BYTES && !self.warned {
            warn!(bytes = self.buf.len(), "Stdout buffer above warning threshold");
            self.warned = true;
        }

        let lines = self.drain_lines();

        if overflow {
            let dropped = self.buf.len();
            if dropped > 0 {
                warn!(dropped, "Stdout buffer exceeded hard cap, discarding incomplete data");
                self.resync = true;
            }
            self.clear();
        } else if self.buf.len() <= WARN_THRESHOLD_BYTES {
            self.warned = false;
        }

        lines
    }

    /// Bytes currently held (the incomplete tail).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Release all buffered data.
    pub fn clear(&mut self) {
        self.buf = Vec::new();
        self.warned = false;
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.buf.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.buf.drain(..=last_newline).collect();
        complete
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }
}
