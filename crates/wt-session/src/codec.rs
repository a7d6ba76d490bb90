//! `MessageCodec` — frame typing and JSON schema for control messages.
//! Transport framing (binary vs. text) is the native distinction the
//! underlying websocket layer already gives us; this module only concerns
//! itself with the JSON shape of control (text-frame) messages.

use serde::{Deserialize, Serialize};

/// Control message sent from server to client announcing a freshly created
/// session's id, so the client can update its URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionAnnounce {
    #[serde(rename = "type")]
    pub kind: SessionAnnounceKind,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionAnnounceKind {
    Session,
}

impl SessionAnnounce {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: SessionAnnounceKind::Session,
            id: id.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("SessionAnnounce always serializes")
    }
}

/// Control message sent from server to client when the PTY child has
/// terminated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitNotice {
    #[serde(rename = "type")]
    pub kind: ExitNoticeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExitNoticeKind {
    Exit,
}

impl ExitNotice {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ExitNotice always serializes")
    }
}

impl Default for ExitNotice {
    fn default() -> Self {
        Self {
            kind: ExitNoticeKind::Exit,
        }
    }
}

/// A decoded incoming text-frame control message from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Resize { cols: u32, rows: u32 },
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RawClientMessage {
    #[serde(rename = "type")]
    kind: String,
    cols: Option<i64>,
    rows: Option<i64>,
}

impl ClientMessage {
    /// Parse a text frame. Malformed JSON or an unrecognized/invalid `type`
    /// decodes to `Unknown` rather than erroring.
    pub fn parse(text: &str) -> Self {
        let Ok(raw) = serde_json::from_str::<RawClientMessage>(text) else {
            return ClientMessage::Unknown;
        };
        match raw.kind.as_str() {
            "resize" => match (raw.cols, raw.rows) {
                (Some(cols), Some(rows)) if cols > 0 && rows > 0 => ClientMessage::Resize {
                    cols: cols as u32,
                    rows: rows as u32,
                },
                _ => ClientMessage::Unknown,
            },
            _ => ClientMessage::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_announce_serializes_with_type_discriminator() {
        let msg = SessionAnnounce::new("abc123");
        assert_eq!(msg.to_json(), r#"{"type":"session","id":"abc123"}"#);
    }

    #[test]
    fn exit_notice_has_no_extra_fields() {
        assert_eq!(ExitNotice::default().to_json(), r#"{"type":"exit"}"#);
    }

    #[test]
    fn parses_valid_resize() {
        let msg = ClientMessage::parse(r#"{"type":"resize","cols":80,"rows":24}"#);
        assert_eq!(msg, ClientMessage::Resize { cols: 80, rows: 24 });
    }

    #[test]
    fn rejects_non_positive_resize_dimensions() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"resize","cols":0,"rows":24}"#),
            ClientMessage::Unknown
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"resize","cols":-1,"rows":24}"#),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn unknown_type_is_ignored_not_errored() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"ping"}"#),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn malformed_json_is_ignored_not_errored() {
        assert_eq!(ClientMessage::parse("not json"), ClientMessage::Unknown);
    }
}
