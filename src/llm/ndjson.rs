// src/llm/ndjson.rs
// Newline-delimited JSON decoding over a chunked byte stream

use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::stream::unfold;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Decode one JSON value per line. Lines may be split across network chunks.
///
/// Blank lines are skipped. A line that fails to parse yields an `Err` and the
/// stream continues; a transport error yields an `Err` and ends the stream.
pub fn ndjson_stream<T, E>(
    bytes_stream: impl Stream<Item = Result<Bytes, E>> + Send + 'static,
) -> impl Stream<Item = Result<T>> + Send
where
    T: DeserializeOwned + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let initial_state = (Box::pin(bytes_stream), Vec::<u8>::new(), false);

    unfold(initial_state, |(mut stream, mut buffer, mut finished)| async move {
        loop {
            if let Some(line) = take_line(&mut buffer) {
                match parse_line::<T>(&line) {
                    Some(item) => return Some((item, (stream, buffer, finished))),
                    None => continue,
                }
            }

            if finished {
                // Trailing line without a newline
                let rest = std::mem::take(&mut buffer);
                return parse_line::<T>(&rest).map(|item| (item, (stream, buffer, finished)));
            }

            match stream.next().await {
                Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    // Drop whatever is left; the body is unusable after this
                    buffer.clear();
                    finished = true;
                    return Some((Err(anyhow!("Stream error: {}", e)), (stream, buffer, finished)));
                }
                None => finished = true,
            }
        }
    })
}

fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    Some(line)
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Option<Result<T>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(anyhow!("Invalid UTF-8 in stream: {}", e))),
    };
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).map_err(|e| {
        warn!("Unparseable stream line: {}", text);
        anyhow!("Malformed stream line: {}", e)
    }))
}
