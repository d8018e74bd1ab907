//! JSON-RPC message model

use std::fmt;

use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::rpc::error::{ErrorCode, ResponseError};
use crate::rpc::method::{ControlMethod, WireName};

/// JSON-RPC version tag
pub const JSONRPC_VERSION: &str = "2.0";

/// A request identifier. Never null.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// Progress tokens share the integer-or-string shape of request ids.
pub type ProgressToken = RequestId;

/// Raw method parameters, decoded once the handler's shape is known.
///
/// `None` means the `params` member was absent; an explicit `null` is kept
/// as `Some(Value::Null)` so re-serialization reproduces the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Option<Value>);

impl Params {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// Decodes into the concrete payload type of a method.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, ResponseError> {
        serde_json::from_value(self.0.unwrap_or(Value::Null)).map_err(|e| {
            ResponseError::new(ErrorCode::InvalidParams).with_message(format!("Invalid params: {}", e))
        })
    }
}

impl From<Option<Value>> for Params {
    fn from(value: Option<Value>) -> Self {
        Self(value)
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Self(Some(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Params,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Params) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.params.is_absent() { 3 } else { 4 };
        let mut state = serializer.serialize_struct("Request", len)?;
        state.serialize_field("jsonrpc", JSONRPC_VERSION)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("method", &self.method)?;
        if let Some(params) = self.params.as_value() {
            state.serialize_field("params", params)?;
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Params,
}

/// `$/cancelRequest` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelParams {
    pub id: RequestId,
}

/// `$/progress` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressParams<T = Value> {
    pub token: ProgressToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Builds a `$/cancelRequest` notification for `id`.
    pub fn cancel_request(id: RequestId) -> Self {
        let params = serde_json::json!({ "id": id });
        Self::new(ControlMethod::CancelRequest.wire_name(), params.into())
    }

    /// Builds a `$/progress` notification for `token`.
    pub fn progress<T: Serialize>(token: ProgressToken, value: Option<T>) -> serde_json::Result<Self> {
        let params = serde_json::to_value(ProgressParams { token, value })?;
        Ok(Self::new(ControlMethod::Progress.wire_name(), params.into()))
    }
}

impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.params.is_absent() { 2 } else { 3 };
        let mut state = serializer.serialize_struct("Notification", len)?;
        state.serialize_field("jsonrpc", JSONRPC_VERSION)?;
        state.serialize_field("method", &self.method)?;
        if let Some(params) = self.params.as_value() {
            state.serialize_field("params", params)?;
        }
        state.end()
    }
}

/// A response. The outcome is either a result or an error, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub outcome: Result<Value, ResponseError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    pub fn error(id: RequestId, error: ResponseError) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }

    pub fn from_code(id: RequestId, code: ErrorCode) -> Self {
        Self::error(id, ResponseError::new(code))
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error_object(&self) -> Option<&ResponseError> {
        self.outcome.as_ref().err()
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 4)?;
        state.serialize_field("jsonrpc", JSONRPC_VERSION)?;
        state.serialize_field("id", &self.id)?;
        match &self.outcome {
            Ok(result) => {
                state.serialize_field("result", result)?;
                state.serialize_field("error", &Option::<ResponseError>::None)?;
            }
            Err(error) => {
                state.serialize_field("result", &Value::Null)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Every message the wire can carry
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

impl Message {
    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request(request) => Some(&request.method),
            Message::Notification(notification) => Some(&notification.method),
            Message::Response(_) => None,
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Message::Request(request) => Some(&request.id),
            Message::Notification(_) => None,
            Message::Response(response) => Some(&response.id),
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Message::Request(request) => request.serialize(serializer),
            Message::Notification(notification) => notification.serialize(serializer),
            Message::Response(response) => response.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_id_accepts_numbers_and_strings() {
        let number: RequestId = serde_json::from_value(json!(7)).unwrap();
        let string: RequestId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(number, RequestId::Number(7));
        assert_eq!(string, RequestId::String("abc".to_string()));
        assert!(serde_json::from_value::<RequestId>(Value::Null).is_err());
    }

    #[test]
    fn success_response_serializes_null_error() {
        let response = Response::success(RequestId::Number(3), json!({"contents": "x"}));
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","id":3,"result":{"contents":"x"},"error":null}"#
        );
    }

    #[test]
    fn error_response_serializes_null_result() {
        let response = Response::from_code(RequestId::Number(4), ErrorCode::MethodNotFound);
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","id":4,"result":null,"error":{"code":-32601,"message":"Method not found"}}"#
        );
    }

    #[test]
    fn notification_omits_id_and_absent_params() {
        let notification = Notification::new("initialized", Params::none());
        assert_eq!(
            serde_json::to_string(&notification).unwrap(),
            r#"{"jsonrpc":"2.0","method":"initialized"}"#
        );
    }

    #[test]
    fn cancel_request_builder_carries_target_id() {
        let notification = Notification::cancel_request(RequestId::Number(5));
        assert_eq!(notification.method, "$/cancelRequest");
        assert_eq!(notification.params.as_value(), Some(&json!({"id": 5})));
    }

    #[test]
    fn progress_builder_omits_missing_value() {
        let notification = Notification::progress::<Value>(RequestId::from("tok"), None).unwrap();
        assert_eq!(notification.method, "$/progress");
        assert_eq!(notification.params.as_value(), Some(&json!({"token": "tok"})));
    }

    #[test]
    fn params_parse_reports_invalid_params() {
        let params = Params::from(json!({"id": "req-7"}));
        let parsed: CancelParams = params.parse().unwrap();
        assert_eq!(parsed.id, RequestId::from("req-7"));

        let error = Params::from(json!({"nope": true}))
            .parse::<CancelParams>()
            .unwrap_err();
        assert_eq!(error.error_code(), Some(ErrorCode::InvalidParams));
    }
}
