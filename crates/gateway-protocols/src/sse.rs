//! Server-sent event framing.

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name, omitted for data-only protocols
    pub event: Option<&'static str>,
    /// Event payload
    pub data: String,
}

impl SseFrame {
    /// Named event
    pub fn named(event: &'static str, data: impl Into<String>) -> Self {
        Self {
            event: Some(event),
            data: data.into(),
        }
    }

    /// Data-only event
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Wire encoding, terminated by a blank line
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.data.len() + 32);
        if let Some(event) = self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

/// An event that can be written to an SSE stream
pub trait ProtocolEvent {
    /// Render the event as a frame
    fn frame(&self) -> SseFrame;
}

/// Serialize to JSON for a frame payload.
///
/// Event types are plain data, so serialization cannot fail in practice; a
/// failure still produces a valid JSON error object rather than a panic.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        serde_json::json!({ "error": { "message": e.to_string() } }).to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_named() {
        let frame = SseFrame::named("message_stop", r#"{"type":"message_stop"}"#);
        assert_eq!(
            frame.encode(),
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"
        );
    }

    #[test]
    fn test_encode_data_only() {
        assert_eq!(SseFrame::data("[DONE]").encode(), "data: [DONE]\n\n");
    }
}
