//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{ChestError, Result};
use crate::value::{ShapeError, Value};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    MemberNotFound = 0x03,
    TypeMismatch = 0x04,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::MemberNotFound),
            0x04 => Some(Status::TypeMismatch),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload:
    /// - OK: bincode `Value` (GET, PING) or empty
    /// - TYPE_MISMATCH: bincode `ShapeError`
    /// - anything else: UTF-8 message
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create an OK response carrying a value
    pub fn value(value: &Value) -> Result<Self> {
        let bytes = bincode::serialize(value)
            .map_err(|e| ChestError::Serialization(format!("Failed to encode value: {}", e)))?;
        Ok(Self::ok(Some(bytes)))
    }

    /// Create a NOT_FOUND response
    pub fn not_found(message: &str) -> Self {
        Self::with_message(Status::NotFound, message)
    }

    /// Create a MEMBER_NOT_FOUND response
    pub fn member_not_found(message: &str) -> Self {
        Self::with_message(Status::MemberNotFound, message)
    }

    /// Create a TYPE_MISMATCH response
    pub fn type_mismatch(reason: &ShapeError) -> Self {
        // Falls back to an empty payload; the status alone is still meaningful
        let payload = bincode::serialize(reason).ok();
        Self {
            status: Status::TypeMismatch,
            payload,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self::with_message(Status::Error, message)
    }

    fn with_message(status: Status, message: &str) -> Self {
        Self {
            status,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Map an engine result onto the wire
    pub fn from_result(result: Result<Option<Value>>) -> Self {
        match result {
            Ok(Some(value)) => {
                Self::value(&value).unwrap_or_else(|e| Self::error(&e.to_string()))
            }
            Ok(None) => Self::ok(None),
            Err(e @ ChestError::KeyNotFound(_)) => Self::not_found(&e.to_string()),
            Err(e @ ChestError::MemberNotFound { .. }) => Self::member_not_found(&e.to_string()),
            Err(ChestError::TypeMismatch { source, .. }) => Self::type_mismatch(&source),
            Err(e) => Self::error(&e.to_string()),
        }
    }

    /// Map a wire response back onto an engine result
    ///
    /// `key` fills in the key name the wire format does not repeat.
    pub fn into_result(self, key: &str) -> Result<Option<Value>> {
        match self.status {
            Status::Ok => match self.payload {
                Some(bytes) => {
                    let value: Value = bincode::deserialize(&bytes).map_err(|e| {
                        ChestError::Protocol(format!("undecodable value in response: {}", e))
                    })?;
                    value
                        .check()
                        .map_err(|e| ChestError::Protocol(format!("ill-formed value: {}", e)))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            },
            Status::NotFound => Err(ChestError::KeyNotFound(key.to_string())),
            Status::MemberNotFound => Err(ChestError::MemberNotFound {
                key: key.to_string(),
            }),
            Status::TypeMismatch => {
                let bytes = self.payload.unwrap_or_default();
                let source: ShapeError = bincode::deserialize(&bytes).map_err(|e| {
                    ChestError::Protocol(format!("undecodable type mismatch reason: {}", e))
                })?;
                Err(ChestError::type_mismatch(key, source))
            }
            Status::Error => {
                let message = self
                    .payload
                    .map(|p| String::from_utf8_lossy(&p).into_owned())
                    .unwrap_or_default();
                Err(ChestError::Remote(message))
            }
        }
    }
}
