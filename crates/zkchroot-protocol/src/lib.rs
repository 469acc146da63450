//! Protocol types for zkchroot client-server communication.
//!
//! Every message travels as a frame: a 4-byte big-endian length header
//! followed by a JSON payload. Requests are tagged by `method`, responses
//! by `status`. Node data is carried base64-encoded so payloads stay
//! valid JSON for arbitrary bytes.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::{Read, Write};

/// Protocol version reported by `Ping`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest payload accepted by [`read_frame`] and produced by
/// [`encode_message`].
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Well-known ports.
pub mod ports {
    /// Default client port of a coordination server.
    pub const CLIENT: u16 = 2181;
}

/// Request sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    /// Liveness check.
    Ping,

    /// Check whether a node exists.
    Exists { path: String },

    /// Create a node. Fails if the parent is missing or the node exists.
    Create {
        path: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },

    /// Read a node's data.
    GetData { path: String },

    /// Replace a node's data.
    SetData {
        path: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },

    /// Delete a childless node.
    Delete { path: String },

    /// List the names of a node's children.
    GetChildren { path: String },

    /// End the session. The server closes the connection after replying.
    Close,
}

/// Response sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Reply to `Ping`.
    Pong { version: u32 },

    /// Reply to `Exists`.
    Exists { exists: bool },

    /// Reply to `Create` with the path that was created.
    Created { path: String },

    /// Reply to `GetData`.
    Data {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },

    /// Reply to `GetChildren`.
    Children { children: Vec<String> },

    /// Generic success.
    Ok,

    /// Request failed.
    Error { code: ErrorCode, message: String },
}

impl Response {
    /// Build an error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }
}

/// Machine-readable failure reason carried by [`Response::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The node (or a required parent) does not exist.
    NoNode,
    /// The node already exists.
    NodeExists,
    /// The node still has children.
    NotEmpty,
    /// A path or argument was malformed.
    BadArguments,
    /// The frame could not be parsed as a request.
    InvalidRequest,
}

/// Errors produced while encoding, reading or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload length exceeds [`MAX_FRAME_SIZE`].
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Payload is not valid JSON for the expected type.
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a message as a length-prefixed frame.
///
/// Messages whose payload would exceed [`MAX_FRAME_SIZE`] are rejected
/// before anything is written.
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, DecodeError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(DecodeError::FrameTooLarge(payload.len()));
    }
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a frame payload (without its length header).
pub fn decode_message<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Read one frame payload.
///
/// Returns `Ok(None)` on a clean end of stream before the header.
pub fn read_frame(reader: &mut impl Read) -> Result<Option<Vec<u8>>, DecodeError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(DecodeError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    tracing::trace!(len, "read frame");
    Ok(Some(buf))
}

/// Encode and write one message.
pub fn write_frame<T: Serialize>(writer: &mut impl Write, msg: &T) -> Result<(), DecodeError> {
    let data = encode_message(msg)?;
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_wire_shape() {
        let req = Request::Create {
            path: "/zktest".into(),
            data: b"hi".to_vec(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["method"], "create");
        assert_eq!(json["path"], "/zktest");
        assert_eq!(json["data"], "aGk=");
    }

    #[test]
    fn test_error_code_wire_shape() {
        let resp = Response::error(ErrorCode::NoNode, "/missing");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "NO_NODE");
    }

    #[test]
    fn test_frame_header_is_big_endian_length() {
        let data = encode_message(&Request::Ping).unwrap();
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        assert_eq!(len, data.len() - 4);
    }

    #[test]
    fn test_read_frame_sequence_then_eof() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Request::Ping).unwrap();
        write_frame(&mut buf, &Request::Exists { path: "/a".into() }).unwrap();

        let mut cursor = Cursor::new(buf);
        let first: Request = decode_message(&read_frame(&mut cursor).unwrap().unwrap()).unwrap();
        let second: Request = decode_message(&read_frame(&mut cursor).unwrap().unwrap()).unwrap();
        assert_eq!(first, Request::Ping);
        assert_eq!(second, Request::Exists { path: "/a".into() });
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_read_frame_rejects_oversized_header() {
        let header = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes();
        let mut cursor = Cursor::new(header.to_vec());
        assert!(matches!(
            read_frame(&mut cursor),
            Err(DecodeError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        // base64 grows the data past the frame limit
        let req = Request::SetData {
            path: "/big".into(),
            data: vec![0u8; MAX_FRAME_SIZE],
        };
        match encode_message(&req) {
            Err(DecodeError::FrameTooLarge(len)) => assert!(len > MAX_FRAME_SIZE),
            other => panic!("expected FrameTooLarge, got {:?}", other.map(|b| b.len())),
        }

        let mut sink = Vec::new();
        assert!(write_frame(&mut sink, &req).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let payload = br#"{"status":"data","data":"not base64!"}"#;
        assert!(decode_message::<Response>(payload).is_err());
    }
}
