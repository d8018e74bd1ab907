//! Frame body decoding and response encoding

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::rpc::error::{ErrorCode, ResponseError};
use crate::rpc::message::{
    JSONRPC_VERSION, Message, Notification, Params, Request, RequestId, Response,
};

/// Header line prefix carrying the body length
pub const CONTENT_LENGTH_HEADER: &str = "Content-Length:";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Body is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid message: {reason}")]
    Invalid {
        id: Option<RequestId>,
        reason: String,
    },
}

impl DecodeError {
    fn invalid(id: Option<RequestId>, reason: impl Into<String>) -> Self {
        DecodeError::Invalid {
            id,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::Parse(_) => ErrorCode::ParseError,
            DecodeError::Invalid { .. } => ErrorCode::InvalidRequest,
        }
    }

    /// The request id recovered from the malformed body, if any
    pub fn salvaged_id(&self) -> Option<&RequestId> {
        match self {
            DecodeError::Parse(_) => None,
            DecodeError::Invalid { id, .. } => id.as_ref(),
        }
    }

    /// The error response owed to the sender, when there is an id to address.
    pub fn to_response(&self) -> Option<Response> {
        let id = self.salvaged_id()?.clone();
        let error = ResponseError::new(self.code()).with_message(self.to_string());
        Some(Response::error(id, error))
    }
}

/// Decodes a frame body into a message.
///
/// Unknown members are ignored. The presence of `id` separates requests from
/// notifications; a body with `id` and `result` or `error` but no `method` is
/// a response to a server-initiated request.
pub fn decode(body: &[u8]) -> Result<Message, DecodeError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(mut object) = value else {
        return Err(DecodeError::invalid(None, "message must be a JSON object"));
    };

    let id = match object.remove("id") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<RequestId>(raw)
                .map_err(|_| DecodeError::invalid(None, "id must be an integer or a string"))?,
        ),
    };

    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(DecodeError::invalid(
                id,
                format!("unsupported jsonrpc version {}", other),
            ));
        }
        None => return Err(DecodeError::invalid(id, "missing jsonrpc version tag")),
    }

    match object.remove("method") {
        Some(Value::String(method)) => {
            let params = Params::from(object.remove("params"));
            Ok(match id {
                Some(id) => Message::Request(Request { id, method, params }),
                None => Message::Notification(Notification { method, params }),
            })
        }
        Some(_) => Err(DecodeError::invalid(id, "method must be a string")),
        None => decode_response(id, object),
    }
}

fn decode_response(
    id: Option<RequestId>,
    mut object: Map<String, Value>,
) -> Result<Message, DecodeError> {
    let result = object.remove("result");
    let error = object.remove("error");
    if result.is_none() && error.is_none() {
        return Err(DecodeError::invalid(id, "missing method"));
    }
    let Some(id) = id else {
        return Err(DecodeError::invalid(None, "response without id"));
    };

    let outcome = match (result.unwrap_or(Value::Null), error.unwrap_or(Value::Null)) {
        (result, Value::Null) => Ok(result),
        (Value::Null, error) => Err(serde_json::from_value::<ResponseError>(error).map_err(|e| {
            DecodeError::invalid(Some(id.clone()), format!("malformed error object: {}", e))
        })?),
        _ => {
            return Err(DecodeError::invalid(
                Some(id),
                "response carries both result and error",
            ));
        }
    };
    Ok(Message::Response(Response { id, outcome }))
}

/// Prefixes a serialized body with its Content-Length header.
///
/// The length is the UTF-8 byte count of `body`.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\r\n\r\n", CONTENT_LENGTH_HEADER, body.len());
    let mut framed = Vec::with_capacity(header.len() + body.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(body);
    framed
}

fn encode_message<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(message).map(|body| frame(&body))
}

/// Encodes a response into a complete frame.
pub fn encode(response: &Response) -> serde_json::Result<Vec<u8>> {
    encode_message(response)
}

/// Encodes an outbound notification into a complete frame.
pub fn encode_notification(notification: &Notification) -> serde_json::Result<Vec<u8>> {
    encode_message(notification)
}
