//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The server and client don't care HOW an [`Envelope`](crate::Envelope)
//! becomes bytes, only that something implements [`Codec`]. JSON is the
//! default because frames stay readable in logs and browser DevTools.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use coinrush_protocol::{ClientRequest, Codec, Envelope, JsonCodec, Payload};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::new(1, 5000, Payload::Request(ClientRequest::StartSession));
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Payload, PlayerId, ServerEvent};

    #[test]
    fn test_json_codec_encodes_event_envelope() {
        let env = Envelope::new(
            3,
            250,
            Payload::Event(ServerEvent::PlayerDisconnected {
                player_id: PlayerId(9),
            }),
        );
        let bytes = JsonCodec.encode(&env).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["payload"]["type"], "Event");
        assert_eq!(json["payload"]["data"]["type"], "PlayerDisconnected");
        assert_eq!(json["payload"]["data"]["player_id"], 9);
    }

    #[test]
    fn test_json_codec_decode_error_is_decode_variant() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"{\"seq\": 1}");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
