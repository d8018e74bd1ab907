//! JSON-RPC layer
//! - error.rs: error codes, reserved ranges, wire error object
//! - method.rs: method enums and their wire names
//! - message.rs: request / notification / response model
//! - codec.rs: body decoding, response and notification framing
//! - transport.rs: Content-Length frame reader and writer

pub mod codec;
pub mod error;
pub mod message;
pub mod method;
pub mod transport;

pub use codec::{DecodeError, decode, encode, encode_notification};
pub use error::{ApplicationCode, ErrorCode, ResponseError, to_response_error};
pub use message::{Message, Notification, Params, Request, RequestId, Response};
pub use method::{ControlMethod, LspMethod, WireName};
pub use transport::{Frame, FrameError, FrameReader, FrameWriter, ReaderLimits};
