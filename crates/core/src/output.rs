// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output chunks: the durable, append-only record of everything a session's
//! child process wrote, plus the shape of the live in-memory ring buffer.

use serde::{Deserialize, Serialize};

use crate::clock::MillisSinceEpoch;
use crate::session::SessionId;

/// Default cap on the live ring buffer per session, in bytes.
pub const MAX_BUFFER_BYTES_DEFAULT: usize = 50 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTag {
    Stdout,
    Stderr,
}

crate::simple_display!(StreamTag {
    Stdout => "stdout",
    Stderr => "stderr",
});

/// A durable output record. The PTY merges stdout/stderr into a single byte
/// stream, so `stream` is `Stdout` for everything produced by the PTY
/// Supervisor; `Stderr` is retained for output sourced any other way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputChunk {
    pub session: SessionId,
    pub at: MillisSinceEpoch,
    pub stream: StreamTag,
    pub bytes: Vec<u8>,
}

impl OutputChunk {
    pub fn new(session: SessionId, at: MillisSinceEpoch, stream: StreamTag, bytes: Vec<u8>) -> Self {
        Self { session, at, stream, bytes }
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Bounded tail of recent output bytes for one live session. Distinct from
/// the durable Output log: eviction here never touches the store.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    cap_bytes: usize,
    data: std::collections::VecDeque<u8>,
}

impl RingBuffer {
    pub fn new(cap_bytes: usize) -> Self {
        Self { cap_bytes, data: std::collections::VecDeque::with_capacity(cap_bytes.min(4096)) }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.data.extend(bytes);
        while self.data.len() > self.cap_bytes {
            self.data.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn tail_bytes(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }

    pub fn tail_str_lossy(&self) -> String {
        String::from_utf8_lossy(&self.tail_bytes()).into_owned()
    }

    /// Last `n` lines of the buffer, newline-delimited, lossily decoded.
    pub fn tail_lines(&self, n: usize) -> Vec<String> {
        let text = self.tail_str_lossy();
        let mut lines: Vec<String> = text.lines().map(str::to_owned).collect();
        if lines.len() > n {
            let drop = lines.len() - n;
            lines.drain(0..drop);
        }
        lines
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(MAX_BUFFER_BYTES_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest_bytes_past_cap() {
        let mut rb = RingBuffer::new(4);
        rb.push(b"abcdef");
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.tail_str_lossy(), "cdef");
    }

    #[test]
    fn tail_lines_respects_n() {
        let mut rb = RingBuffer::new(1024);
        rb.push(b"one\ntwo\nthree\n");
        assert_eq!(rb.tail_lines(2), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn output_chunk_decodes_lossily() {
        let chunk = OutputChunk::new(SessionId::new(), 0, StreamTag::Stdout, b"hello".to_vec());
        assert_eq!(chunk.as_str_lossy(), "hello");
    }
}
