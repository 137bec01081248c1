//! Incremental server-sent-events parser for the remote MCP stream.

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event type; `message` when the server sent no `event:` field.
    pub event: String,
    pub data: String,
}

/// Turns raw byte chunks into complete [`SseFrame`]s.
///
/// Chunks may split lines and UTF-8 sequences anywhere; incomplete input is
/// buffered until the next call.
#[derive(Default)]
pub struct SseParser {
    bytes: Vec<u8>,
    text: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.bytes.extend_from_slice(chunk);
        let take = match std::str::from_utf8(&self.bytes) {
            Ok(_) => self.bytes.len(),
            // Truncated trailing sequence: keep it for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.bytes.len(),
        };
        let decoded: Vec<u8> = self.bytes.drain(..take).collect();
        self.text.push_str(&String::from_utf8_lossy(&decoded));
        if self.text.contains('\r') {
            self.text = self.text.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.text.find("\n\n") {
            let block: String = self.text.drain(..pos + 2).collect();
            if let Some(frame) = parse_block(&block[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }

    Some(SseFrame {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}
