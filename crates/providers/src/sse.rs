//! Server-sent-events plumbing for streaming model responses.
//!
//! A response body is buffered, split into events on blank lines, and each
//! `data:` payload is handed to an adapter-specific parser that turns it into
//! zero or more [`StreamEvent`]s.

use crate::util::from_reqwest;
use pr_domain::error::Result;
use pr_domain::stream::{BoxStream, StreamEvent};

/// Append a raw body chunk to the buffer, normalizing CRLF line endings so
/// event splitting only has to look for `\n\n`.
pub(crate) fn push_chunk(buffer: &mut String, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    if text.contains('\r') {
        buffer.push_str(&text.replace("\r\n", "\n"));
    } else {
        buffer.push_str(&text);
    }
}

/// Extract complete `data:` payloads from an SSE buffer.
///
/// The buffer is drained in-place: consumed bytes are removed and any
/// trailing partial event remains for the next call. Multiple `data:` lines
/// inside one event are joined with `\n`.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos + 2).collect();

        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.trim().strip_prefix("data:"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        if !data.is_empty() {
            payloads.push(data.join("\n"));
        }
    }

    payloads
}

/// Build a [`BoxStream`] from an SSE response and a parser closure.
///
/// The closure is `FnMut` so adapters can keep assembly state across
/// payloads. A fallback `Done` is emitted if the parser never produced one.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_emitted = false;

        loop {
            let finished = match response.chunk().await {
                Ok(Some(bytes)) => {
                    push_chunk(&mut buffer, &bytes);
                    false
                }
                Ok(None) => {
                    // Flush a trailing event that lacked its blank line.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                    }
                    true
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            };

            for data in drain_data_lines(&mut buffer) {
                for event in parse_data(&data) {
                    if matches!(&event, Ok(StreamEvent::Done { .. })) {
                        done_emitted = true;
                    }
                    yield event;
                }
            }

            if finished {
                break;
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_single_complete_event() {
        let mut buf = String::from("event: message\ndata: {\"hello\":\"world\"}\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["{\"hello\":\"world\"}"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_partial_event_stays_in_buffer() {
        let mut buf = String::from("data: complete\n\ndata: partial");
        assert_eq!(drain_data_lines(&mut buf), vec!["complete"]);
        assert_eq!(buf, "data: partial");
    }

    #[test]
    fn drain_ignores_comments_and_empty_data() {
        let mut buf = String::from(": keep-alive\n\ndata: \n\nid: 4\ndata: payload\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["payload"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_joins_multiline_data() {
        let mut buf = String::from("data: line one\ndata: line two\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["line one\nline two"]);
    }

    #[test]
    fn crlf_chunks_are_normalized() {
        let mut buf = String::new();
        push_chunk(&mut buf, b"data: a\r\n\r\ndata: ");
        assert_eq!(drain_data_lines(&mut buf), vec!["a"]);
        push_chunk(&mut buf, b"b\r\n\r\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["b"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn done_sentinel_preserved() {
        let mut buf = String::from("data: [DONE]\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["[DONE]"]);
    }
}
