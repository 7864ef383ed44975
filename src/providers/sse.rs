//! Framing for streamed HTTP response bodies
//!
//! Model providers deliver incremental output either as Server-Sent Events
//! (Gemini, `alt=sse`) or as newline-delimited JSON (Ollama). Both are turned
//! into a lazy stream of payload strings here; decoding the payload JSON is
//! the provider's job.
//!
//! SSE field processing:
//!
//! - `data:` lines of one event are joined with `\n`.
//! - `event: ping` events and `data: [PING]` / `data: [DONE]` values are
//!   discarded.
//! - `id:`, `retry:` and comment lines are ignored.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{CtutorError, Result};

/// Stream of SSE `data:` payloads decoded from a raw byte stream.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use futures::StreamExt;
/// use ctutor::providers::sse::sse_data;
///
/// # tokio_test::block_on(async {
/// let body = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from("data: hi\n\n"))]);
/// let events: Vec<String> = sse_data(body).map(|e| e.unwrap()).collect().await;
/// assert_eq!(events, vec!["hi".to_string()]);
/// # });
/// ```
pub fn sse_data<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    frames(byte_stream, b"\n\n", process_sse_event)
}

/// Stream of non-empty lines from a newline-delimited JSON body.
pub fn ndjson_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    frames(byte_stream, b"\n", |line| {
        let line = line.trim();
        (!line.is_empty()).then(|| line.to_string())
    })
}

struct FrameState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    delimiter: &'static [u8],
    decode: fn(&str) -> Option<String>,
    finished: bool,
}

impl<S> FrameState<S> {
    fn drain_frames(&mut self) {
        while let Some(pos) = find(&self.buffer, self.delimiter) {
            let frame: Vec<u8> = self.buffer.drain(..pos + self.delimiter.len()).collect();
            self.push_frame(&frame[..pos]);
        }
    }

    fn push_frame(&mut self, frame: &[u8]) {
        let text = String::from_utf8_lossy(frame);
        if let Some(payload) = (self.decode)(&text) {
            self.pending.push_back(payload);
        }
    }
}

fn frames<S, E>(
    byte_stream: S,
    delimiter: &'static [u8],
    decode: fn(&str) -> Option<String>,
) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = FrameState {
        inner: Box::pin(byte_stream),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        delimiter,
        decode,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.finished {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    // Normalize CRLF framing; payload JSON never carries raw CR.
                    state
                        .buffer
                        .extend(chunk.iter().copied().filter(|b| *b != b'\r'));
                    state.drain_frames();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let err = CtutorError::Provider(format!("Response stream interrupted: {}", e));
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    if !rest.is_empty() {
                        state.push_frame(&rest);
                    }
                }
            }
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Extract the joined `data:` value of a single SSE event block.
fn process_sse_event(event_block: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        }
    }

    if event_type.is_some_and(|et| et.eq_ignore_ascii_case("ping")) {
        return None;
    }

    let data = data_lines.join("\n");
    if data.is_empty() || data.eq_ignore_ascii_case("[ping]") || data == "[DONE]" {
        return None;
    }

    Some(data)
}
