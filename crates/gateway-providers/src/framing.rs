//! Byte-level framing for hand-decoded streaming bodies.
//!
//! Network chunks may end inside a multi-byte character, so bytes are
//! buffered and only complete frames are decoded as UTF-8.

use gateway_core::ProviderError;

/// Buffer of undecoded response bytes
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    bytes: Vec<u8>,
}

impl FrameBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Next complete line, without its `\n` or `\r\n` terminator
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.bytes.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.bytes.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Next complete SSE event, terminated by a blank line
    pub(crate) fn next_event(&mut self) -> Option<Vec<u8>> {
        let (pos, sep) = [&b"\r\n\r\n"[..], &b"\n\n"[..]]
            .iter()
            .filter_map(|sep| find(&self.bytes, sep).map(|pos| (pos, sep.len())))
            .min_by_key(|(pos, _)| *pos)?;
        let mut event: Vec<u8> = self.bytes.drain(..pos + sep).collect();
        event.truncate(pos);
        Some(event)
    }

    /// Whatever is left once the body has ended, if it is not blank
    pub(crate) fn take_remainder(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.bytes);
        if rest.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(rest)
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Decode one complete frame
pub(crate) fn decode_frame(provider: &str, frame: Vec<u8>) -> Result<String, ProviderError> {
    String::from_utf8(frame)
        .map_err(|e| ProviderError::stream(provider, format!("Invalid UTF-8 in stream: {e}")))
}

/// Joined `data:` lines of one SSE event
pub(crate) fn event_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
