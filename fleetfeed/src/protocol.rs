//! Channel wire frames: a closed, `type`-tagged JSON message union.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::ServerSnapshot;

/// Frames the client sends over the channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame {
    /// Heartbeat probe; the backend answers with a pong frame.
    Ping,
}

/// Frames the backend sends over the channel.
///
/// Servers attach extra fields (e.g. a `timestamp`) to some frames; those are
/// tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingFrame {
    /// Heartbeat acknowledgment.
    Pong,
    /// Complete world-view of all known servers.
    ServerStatusUpdate { data: Vec<ServerSnapshot> },
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unrecognized frame type {0:?}")]
    UnknownType(String),
    #[error("frame has no type field")]
    MissingType,
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

const KNOWN_TYPES: &[&str] = &["pong", "server_status_update"];

/// Decode one inbound text frame against the closed message-type union.
///
/// Distinguishes frames of unknown `type` (to be dropped after logging) from
/// malformed payloads (to be reported as transport errors); neither closes
/// the connection.
pub fn decode_frame(text: &str) -> Result<IncomingFrame, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(FrameError::MissingType);
    };
    if !KNOWN_TYPES.contains(&kind) {
        return Err(FrameError::UnknownType(kind.to_owned()));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_serializes_as_tagged_object() {
        let json = serde_json::to_string(&OutgoingFrame::Ping).expect("serialize ping");
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn pong_with_extra_fields_decodes() {
        let frame = decode_frame(r#"{"type":"pong","timestamp":1700000000}"#).expect("decode pong");
        assert!(matches!(frame, IncomingFrame::Pong));
    }

    #[test]
    fn status_update_decodes_to_batch() {
        let frame = decode_frame(r#"{"type":"server_status_update","data":[],"timestamp":1}"#)
            .expect("decode update");
        match frame {
            IncomingFrame::ServerStatusUpdate { data } => assert!(data.is_empty()),
            other => panic!("expected ServerStatusUpdate, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_classified_not_malformed() {
        let err = decode_frame(r#"{"type":"config_reload"}"#).expect_err("should not decode");
        match err {
            FrameError::UnknownType(kind) => assert_eq!(kind, "config_reload"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn garbage_and_missing_type_are_errors() {
        assert!(matches!(
            decode_frame("not json at all"),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            decode_frame(r#"{"data":[]}"#),
            Err(FrameError::MissingType)
        ));
        // known type with a bad payload is malformed, not unknown
        assert!(matches!(
            decode_frame(r#"{"type":"server_status_update","data":"nope"}"#),
            Err(FrameError::Malformed(_))
        ));
    }
}
