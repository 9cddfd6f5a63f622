//! Wire protocol
//!
//! JSON objects over a plain TCP stream, one request and one response per
//! round trip.
//!
//! Request (client → peer), no length prefix, no terminator:
//!
//! ```text
//! {"command":"get","args":["notes.txt"],"closed":false}
//! ```
//!
//! Response (peer → client), terminated by a single `\n` byte:
//!
//! ```text
//! {"success":true,"result":"<base64>","fileName":"notes.txt"}\n
//! ```
//!
//! `args` is `null` for an argument-less command. `result` carries the
//! payload bytes base64 encoded; on failure `errorDescription` replaces it.
//! A request whose `closed` flag is true tells the peer to drop the
//! connection without answering. Decoders treat an absent `closed` key as
//! true because historical encoders omitted the flag in exactly that case.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::Command;

/// Byte ending every peer response.
pub const RESPONSE_TERMINATOR: u8 = b'\n';

/// Errors raised while encoding or decoding wire messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Message could not be serialized
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Response bytes did not parse as a protocol message
    #[error("malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// A field the response contract requires was absent
    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),

    /// `result` payload was not valid base64
    #[error("invalid base64 in result payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    /// Display payload was not valid UTF-8
    #[error("result payload is not valid UTF-8: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),
}

/// Request message (client → peer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Command name as the operator typed it
    pub command: String,
    /// Arguments in order; `null` on the wire when the command had none
    pub args: Option<Vec<String>>,
    /// Tells the peer to drop the connection instead of answering.
    /// Absent on the wire means true.
    #[serde(default = "default_closed")]
    pub closed: bool,
}

fn default_closed() -> bool {
    true
}

impl From<&Command> for CommandMessage {
    fn from(command: &Command) -> Self {
        let args = if command.args.is_empty() {
            None
        } else {
            Some(command.args.clone())
        };
        Self {
            command: command.name.clone(),
            args,
            closed: command.terminate,
        }
    }
}

/// Response message (peer → client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    /// Whether the command succeeded on the peer
    pub success: bool,
    /// Payload bytes, base64 encoded; present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Peer-side path of the file a download carries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Human-readable failure description; present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl ResponseMessage {
    /// Successful response carrying payload bytes.
    pub fn ok(payload: &[u8]) -> Self {
        Self {
            success: true,
            result: Some(encode_payload(payload)),
            file_name: None,
            error_description: None,
        }
    }

    /// Successful download response carrying payload bytes and the peer-side
    /// file path.
    pub fn ok_file(payload: &[u8], file_name: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(encode_payload(payload)),
            file_name: Some(file_name.into()),
            error_description: None,
        }
    }

    /// Failure response carrying a description.
    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            file_name: None,
            error_description: Some(description.into()),
        }
    }
}

/// Encode a request for the wire.
///
/// Requests carry no framing of their own; the peer's streaming decoder
/// finds the object boundary itself.
pub fn encode_command(message: &CommandMessage) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(ProtocolError::Encode)
}

/// Encode a response for the wire, terminator appended.
pub fn encode_response(message: &ResponseMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(message).map_err(ProtocolError::Encode)?;
    bytes.push(RESPONSE_TERMINATOR);
    Ok(bytes)
}

/// Decode a peer response from a framed buffer.
///
/// The buffer is everything the transport accumulated for one response,
/// terminator included; the parser tolerates the trailing whitespace.
pub fn decode_response(buffer: &[u8]) -> Result<ResponseMessage, ProtocolError> {
    serde_json::from_slice(buffer).map_err(ProtocolError::MalformedResponse)
}

/// Base64-encode payload bytes for the `result` field.
pub fn encode_payload(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode the base64 payload of a response.
///
/// # Errors
///
/// `MissingField` when the response carries no `result`, `InvalidPayload`
/// when it is not valid base64.
pub fn decode_payload(response: &ResponseMessage) -> Result<Vec<u8>, ProtocolError> {
    let encoded = response
        .result
        .as_deref()
        .ok_or(ProtocolError::MissingField("result"))?;
    Ok(BASE64.decode(encoded)?)
}
