use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};

use super::{usage_from_slice, NormalizedUsage};

/// Longest partial line kept while waiting for its newline
const MAX_PENDING_LINE_BYTES: usize = 1024 * 1024;

/// Incremental scanner for usage in an SSE byte stream.
///
/// Bytes are fed in arbitrary chunks; only the current unterminated line is
/// buffered. The last `data:` event carrying usage wins.
#[derive(Debug, Default)]
pub struct SseUsageScanner {
    buffer: BytesMut,
    discarding: bool,
    usage: Option<NormalizedUsage>,
}

impl SseUsageScanner {
    /// Create an empty scanner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the stream
    pub fn ingest(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            if self.discarding {
                self.discarding = false;
                continue;
            }
            self.scan_line(&line);
        }

        if self.buffer.len() > MAX_PENDING_LINE_BYTES {
            self.buffer.clear();
            self.discarding = true;
        }
    }

    /// Usage seen so far
    #[must_use]
    pub fn usage(&self) -> Option<NormalizedUsage> {
        self.usage
    }

    /// Flush a trailing line without a newline and return the final usage
    #[must_use]
    pub fn finish(mut self) -> Option<NormalizedUsage> {
        if !self.discarding && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.scan_line(&rest);
        }
        self.usage
    }

    fn scan_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let Some(payload) = line.trim().strip_prefix("data:") else {
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            return;
        }
        if let Some(usage) = usage_from_slice(payload.as_bytes()) {
            self.usage = Some(usage);
        }
    }
}

/// Drain an SSE body and return the last usage it carried.
///
/// A stream error ends the scan; whatever was seen before it is kept.
pub async fn usage_from_sse_stream<S, E>(stream: S) -> Option<NormalizedUsage>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut scanner = SseUsageScanner::new();
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => scanner.ingest(&bytes),
            Err(_) => break,
        }
    }
    scanner.finish()
}
