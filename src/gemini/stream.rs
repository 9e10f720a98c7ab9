//! Decoding of the `alt=sse` response body into generation chunks.

use super::api::{APIError, Response};
use super::Error;

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use log::trace;
use serde::Deserialize;
use std::collections::VecDeque;

pub type ChunkStream = BoxStream<'static, Result<Response, Error>>;

/// Splits a server-sent event body into the `data` payload of each event.
/// Bytes are buffered until a full line is available, so multi-byte characters
/// split across network reads survive.
#[derive(Default)]
pub struct EventDecoder {
  buf: Vec<u8>,
  data: Vec<String>,
}

impl EventDecoder {
  pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
    self.buf.extend_from_slice(bytes);
    let mut events = vec![];

    while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
      let line = self.buf.drain(..=pos).collect::<Vec<u8>>();
      let line = String::from_utf8_lossy(&line);
      let line = line.trim_end_matches(['\n', '\r']);

      if line.is_empty() {
        events.extend(self.dispatch());
      } else if let Some(value) = line.strip_prefix("data:") {
        self.data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
      }
      // comments, `event:`, `id:` and `retry:` fields carry nothing we use
    }

    events
  }

  /// Flush whatever is left once the body ends without a trailing blank line.
  pub fn finish(&mut self) -> Vec<String> {
    let mut events = vec![];
    if !self.buf.is_empty() {
      let rest = std::mem::take(&mut self.buf);
      events.extend(self.push(&rest));
      events.extend(self.push(b"\n"));
    }
    events.extend(self.dispatch());
    events
  }

  fn dispatch(&mut self) -> Option<String> {
    if self.data.is_empty() {
      return None;
    }
    let data = self.data.join("\n");
    self.data.clear();
    Some(data)
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Event {
  Failure { error: APIError },
  Chunk(Response),
}

fn parse_event(data: &str) -> Result<Response, Error> {
  trace!("event: {}", data);
  match serde_json::from_str(data)? {
    Event::Failure { error } => Err(error.into()),
    Event::Chunk(chunk) => Ok(chunk),
  }
}

struct State<S> {
  bytes: S,
  decoder: EventDecoder,
  pending: VecDeque<String>,
  done: bool,
}

/// Turn a raw body stream into a stream of chunks. The stream ends when the body
/// ends; a transport error is yielded once and ends it too.
pub fn decode_events<S, B, E>(bytes: S) -> ChunkStream
where
  S: Stream<Item = Result<B, E>> + Send + 'static,
  B: AsRef<[u8]> + Send + 'static,
  E: Into<Error> + Send + 'static,
{
  let state = State {
    bytes: Box::pin(bytes),
    decoder: EventDecoder::default(),
    pending: VecDeque::new(),
    done: false,
  };

  stream::unfold(state, |mut st| async move {
    loop {
      if let Some(data) = st.pending.pop_front() {
        let item = parse_event(&data);
        return Some((item, st));
      }
      if st.done {
        return None;
      }
      match st.bytes.next().await {
        Some(Ok(chunk)) => {
          let events = st.decoder.push(chunk.as_ref());
          st.pending.extend(events);
        }
        Some(Err(e)) => {
          st.done = true;
          st.pending.clear();
          return Some((Err(e.into()), st));
        }
        None => {
          st.done = true;
          let events = st.decoder.finish();
          st.pending.extend(events);
        }
      }
    }
  })
  .boxed()
}
