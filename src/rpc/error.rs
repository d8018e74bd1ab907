//! Error codes and the wire error object
//!
//! Codes are partitioned into the ranges the JSON-RPC and LSP specifications
//! reserve. Everything inside a reserved range is listed in [`ErrorCode`];
//! any other code a handler wants to report goes through [`ApplicationCode`],
//! which refuses reserved values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Codes predefined by JSON-RPC 2.0 (parse error through server errors)
pub const JSONRPC_PREDEFINED_START: i64 = -32768;
pub const JSONRPC_PREDEFINED_END: i64 = -32000;

/// JSON-RPC reserved server error range
pub const JSONRPC_RESERVED_START: i64 = -32099;
pub const JSONRPC_RESERVED_END: i64 = -32000;

/// LSP reserved error range
pub const LSP_RESERVED_START: i64 = -32899;
pub const LSP_RESERVED_END: i64 = -32800;

/// Returns true if `code` lies in a range owned by JSON-RPC or LSP.
pub const fn is_reserved(code: i64) -> bool {
    (code >= JSONRPC_PREDEFINED_START && code <= JSONRPC_PREDEFINED_END)
        || (code >= LSP_RESERVED_START && code <= LSP_RESERVED_END)
}

/// An error code outside every reserved range.
///
/// Build it in a `const` item so a reserved value fails at compile time:
///
/// ```
/// use dedukt_lsp::rpc::error::ApplicationCode;
/// const GRAMMAR_MISMATCH: ApplicationCode = ApplicationCode::new(1001);
/// assert_eq!(GRAMMAR_MISMATCH.get(), 1001);
/// ```
///
/// ```compile_fail
/// use dedukt_lsp::rpc::error::ApplicationCode;
/// const CLASH: ApplicationCode = ApplicationCode::new(-32801);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplicationCode(i64);

impl ApplicationCode {
    pub const fn new(code: i64) -> Self {
        assert!(
            !is_reserved(code),
            "error code lies inside a reserved JSON-RPC or LSP range"
        );
        Self(code)
    }

    pub const fn try_new(code: i64) -> Option<Self> {
        if is_reserved(code) {
            None
        } else {
            Some(Self(code))
        }
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

/// Canonical error table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Defined by JSON-RPC
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,

    // JSON-RPC reserved range, kept for backwards compatibility
    ServerNotInitialized,
    UnknownErrorCode,

    // LSP reserved range
    RequestFailed,
    ServerCancelled,
    ContentModified,
    RequestCancelled,

    Application(ApplicationCode),
}

impl ErrorCode {
    /// Every reserved-range member of the table
    pub const RESERVED: [ErrorCode; 11] = [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::ServerNotInitialized,
        ErrorCode::UnknownErrorCode,
        ErrorCode::RequestFailed,
        ErrorCode::ServerCancelled,
        ErrorCode::ContentModified,
        ErrorCode::RequestCancelled,
    ];

    pub const fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerNotInitialized => -32002,
            ErrorCode::UnknownErrorCode => -32001,
            ErrorCode::RequestFailed => -32803,
            ErrorCode::ServerCancelled => -32802,
            ErrorCode::ContentModified => -32801,
            ErrorCode::RequestCancelled => -32800,
            ErrorCode::Application(code) => code.get(),
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerNotInitialized => "Server not initialized",
            ErrorCode::UnknownErrorCode => "Unknown error",
            ErrorCode::RequestFailed => "Request failed",
            ErrorCode::ServerCancelled => "Server cancelled",
            ErrorCode::ContentModified => "Content modified",
            ErrorCode::RequestCancelled => "Request cancelled",
            ErrorCode::Application(_) => "Application error",
        }
    }

    /// Maps a wire code back onto the table.
    pub fn from_code(code: i64) -> Option<ErrorCode> {
        Self::RESERVED
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .or_else(|| ApplicationCode::try_new(code).map(ErrorCode::Application))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl From<ApplicationCode> for ErrorCode {
    fn from(code: ApplicationCode) -> Self {
        ErrorCode::Application(code)
    }
}

/// The `error` member of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: ErrorCode) -> Self {
        to_response_error(code, None)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

pub fn to_response_error(code: ErrorCode, data: Option<Value>) -> ResponseError {
    ResponseError {
        code: code.code(),
        message: code.message().to_string(),
        data,
    }
}
