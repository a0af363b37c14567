//! Frame encoding and decoding
//!
//! Each WebSocket text frame carries exactly one JSON message, so no extra
//! framing is needed. Decoding never panics: empty and malformed payloads come
//! back as [`CodecError`] for the caller to handle per connection.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Frame codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Empty frame")]
    Empty,

    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode a message as a single text frame payload
pub fn encode<M: Serialize>(msg: &M) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode a text frame payload
pub fn decode<M: DeserializeOwned>(text: &str) -> Result<M, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

/// Decode a binary frame payload (same JSON encoding as text frames)
pub fn decode_bytes<M: DeserializeOwned>(bytes: &[u8]) -> Result<M, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{ClientMsg, Direction, Game, Position, ServerMsg};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn unknown_tag_decodes_to_noop_variant() {
        let msg: ClientMsg = assert_ok!(decode(r#"{"type":"joinGameRequest"}"#));
        assert_eq!(msg, ClientMsg::Unknown);

        let msg: ServerMsg = assert_ok!(decode(r#"{"type":"somethingNew","extra":[1,2]}"#));
        assert_eq!(msg, ServerMsg::Unknown);
    }

    #[test]
    fn empty_frame_is_an_error() {
        assert!(matches!(decode::<ClientMsg>(""), Err(CodecError::Empty)));
        assert!(matches!(decode::<ClientMsg>("  \n"), Err(CodecError::Empty)));
        assert!(matches!(decode_bytes::<ClientMsg>(b""), Err(CodecError::Empty)));
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert_err!(decode::<ClientMsg>("{not json"));
        assert_err!(decode::<ClientMsg>(r#"{"id":1}"#));
        assert_err!(decode::<ClientMsg>(r#"{"type":"playerInput","id":"one"}"#));
        assert_err!(decode_bytes::<ServerMsg>(&[0xff, 0x00, 0x12]));
    }

    #[test]
    fn binary_frames_decode_like_text() {
        let bytes = br#"{"type":"playerInput","id":2,"input":{"direction":{"x":0,"y":0,"z":1}}}"#;
        let msg: ClientMsg = assert_ok!(decode_bytes(bytes));
        match msg {
            ClientMsg::PlayerInput { id, input } => {
                assert_eq!(id, 2);
                assert_eq!(input.direction, Direction::new(0.0, 0.0, 1.0));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn snapshot_frame_decodes_to_the_same_world() {
        let game = Game {
            positions: [
                (1, Position::new(1.0, 0.0, -0.1)),
                (2, Position::new(2.05, 0.0, 0.0)),
                (12, Position::new(12.0, 0.5, 3.25)),
            ]
            .into_iter()
            .collect(),
        };
        let sent = ServerMsg::GameUpdate { game };

        let text = assert_ok!(encode(&sent));
        let received: ServerMsg = assert_ok!(decode(&text));
        assert_eq!(received, sent);

        let received: ServerMsg = assert_ok!(decode_bytes(text.as_bytes()));
        assert_eq!(received, sent);
    }

    #[test]
    fn encoded_init_client_is_one_json_object() {
        let text = assert_ok!(encode(&ServerMsg::InitClient { id: 1 }));
        assert_eq!(text, r#"{"type":"initClient","id":1}"#);
    }
}
