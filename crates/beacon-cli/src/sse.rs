//! Incremental parser for `text/event-stream` bodies.

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
  pub event: String,
  pub data:  String,
}

/// Feed it chunks as they arrive; it yields events as they complete.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// character split across chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseParser {
  buffer: Vec<u8>,
  event:  Option<String>,
  data:   Vec<String>,
}

impl SseParser {
  pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
    self.buffer.extend_from_slice(chunk);
    let mut out = Vec::new();

    while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
      let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
      let line = String::from_utf8_lossy(&raw);
      let line = line.trim_end_matches(['\n', '\r']);

      if line.is_empty() {
        if !self.data.is_empty() {
          out.push(SseEvent {
            event: self.event.take().unwrap_or_else(|| "message".to_string()),
            data:  self.data.join("\n"),
          });
        }
        self.event = None;
        self.data.clear();
        continue;
      }
      // Comment lines carry keep-alives.
      if line.starts_with(':') {
        continue;
      }

      let (field, value) = line.split_once(':').unwrap_or((line, ""));
      let value = value.strip_prefix(' ').unwrap_or(value);
      match field {
        "event" => self.event = Some(value.to_string()),
        "data" => self.data.push(value.to_string()),
        _ => {}
      }
    }

    out
  }
}
