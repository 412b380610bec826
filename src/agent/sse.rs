//! Server-sent-event decoding for provider streams.

use super::AgentError;
use futures_util::stream::{Stream, StreamExt};

/// Incremental splitter that turns raw body bytes into SSE `data:` payloads.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the `data:` payloads of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = Self::data_of(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::data_of(&line)
    }

    fn data_of(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        let data = line.strip_prefix("data:")?;
        Some(data.trim_start().to_string())
    }
}

/// Adapt a response byte stream into a stream of SSE `data:` payloads.
pub fn data_events<S, B>(body: S) -> impl Stream<Item = Result<String, AgentError>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send,
{
    async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut body = Box::pin(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for data in decoder.push(bytes.as_ref()) {
                        yield Ok(data);
                    }
                }
                Err(e) => {
                    yield Err(AgentError::Network(e.without_url().to_string()));
                    return;
                }
            }
        }

        if let Some(data) = decoder.finish() {
            yield Ok(data);
        }
    }
}
