//! Incremental decoder for server-sent completion streams.
//!
//! Bytes arrive in arbitrary read-sized pieces. Three layers turn them into
//! text deltas:
//!
//! 1. [`Utf8Carry`] decodes bytes to text, holding back a code point that is
//!    split across two reads.
//! 2. [`StreamDecoder`] splits text on `\n`, carrying an unterminated line
//!    over to the next read.
//! 3. [`parse_frame`] classifies each complete line as a sentinel, a payload
//!    frame, or noise to discard.
//!
//! A malformed frame is skipped, never fatal. Feeding the same bytes with
//! different read boundaries always yields the same accumulated text.

use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::error::ChatError;
use crate::protocol::StreamChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

// ---------------------------------------------------------------------------
// UTF-8 carry buffer
// ---------------------------------------------------------------------------

/// Stateful UTF-8 decoder that never splits a code point.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes` (prefixed by any held-back bytes) and append the text to
    /// `out`. An incomplete trailing sequence is kept for the next call;
    /// invalid sequences become U+FFFD.
    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        self.pending.extend_from_slice(bytes);
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    // valid_up_to guarantees this range is UTF-8
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + bad;
                        }
                        None => {
                            self.pending.drain(..valid_end);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush held-back bytes at end of input. A truncated code point decodes
    /// to U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One protocol unit decoded from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// `data: [DONE]`
    Done,
    /// A structured payload carrying zero or one text delta.
    Payload { delta: Option<String> },
}

/// Classify one complete line. `None` means the line is discarded: not a
/// `data: ` line (comments, keep-alives, `event:` fields) or a payload whose
/// JSON does not parse.
pub fn parse_frame(line: &str) -> Option<StreamFrame> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload == DONE_SENTINEL {
        return Some(StreamFrame::Done);
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => Some(StreamFrame::Payload {
            delta: chunk.into_delta(),
        }),
        Err(e) => {
            debug!(error = %e, "skipping malformed stream frame");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// StreamDecoder
// ---------------------------------------------------------------------------

/// Carry-buffer + line-splitter + per-line parser.
///
/// Owned by one request/response cycle and not restartable: once the sentinel
/// is seen (or [`finish`](Self::finish) is called) further input is ignored.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    utf8: Utf8Carry,
    line: String,
    accumulated: String,
    done: bool,
    frames: usize,
    skipped: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw read. Returns the non-empty deltas it completed, in order;
    /// each has already been appended to [`accumulated`](Self::accumulated).
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.utf8.decode_into(bytes, &mut self.line);
        let mut deltas = Vec::new();
        while let Some(line_end) = self.line.find('\n') {
            let line: String = self.line.drain(..=line_end).collect();
            self.handle_line(&line[..line.len() - 1], &mut deltas);
            if self.done {
                self.line.clear();
                break;
            }
        }
        deltas
    }

    /// Transport reported end-of-data. Any unterminated last line is treated
    /// as complete. Returns deltas from that line.
    pub fn finish(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }
        self.utf8.finish(&mut self.line);
        let tail = std::mem::take(&mut self.line);
        if !tail.is_empty() {
            self.handle_line(&tail, &mut deltas);
        }
        self.done = true;
        deltas
    }

    fn handle_line(&mut self, line: &str, deltas: &mut Vec<String>) {
        match parse_frame(line) {
            Some(StreamFrame::Done) => {
                self.frames += 1;
                self.done = true;
            }
            Some(StreamFrame::Payload { delta }) => {
                self.frames += 1;
                if let Some(delta) = delta {
                    self.accumulated.push_str(&delta);
                    deltas.push(delta);
                }
            }
            None => {
                if line.starts_with(DATA_PREFIX) {
                    self.skipped += 1;
                }
            }
        }
    }

    /// True once the sentinel arrived or the transport ended.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn into_accumulated(self) -> String {
        self.accumulated
    }

    /// Frames parsed successfully, sentinel included.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// `data: ` lines dropped because their payload was not valid JSON.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }
}

// ---------------------------------------------------------------------------
// Async driver
// ---------------------------------------------------------------------------

/// Drain a byte stream through a [`StreamDecoder`], calling `on_delta` for each
/// delta as soon as it is decoded. Returns the accumulated text.
///
/// Stops reading at the `[DONE]` sentinel or when the stream ends. A transport
/// error aborts the whole decode.
pub async fn decode_stream<S, B, E, F>(stream: S, mut on_delta: F) -> Result<String, ChatError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ChatError>,
    F: FnMut(&str),
{
    tokio::pin!(stream);
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        for delta in decoder.feed(chunk.as_ref()) {
            on_delta(&delta);
        }
        if decoder.is_done() {
            break;
        }
    }
    for delta in decoder.finish() {
        on_delta(&delta);
    }

    debug!(
        frames = decoder.frame_count(),
        skipped = decoder.skipped_count(),
        chars = decoder.accumulated().len(),
        "stream decoded"
    );
    Ok(decoder.into_accumulated())
}
