//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type (bincode)
//! - GET:     key
//! - SET:     (key, Value)
//! - APPEND:  (key, Vec<Scalar>)
//! - SADD:    (key, Scalar)
//! - SEXISTS: (key, Scalar)
//! - PING:    empty
//! - FLUSH:   empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Command, CommandType, Response, Status};
use crate::error::{ChestError, Result};
use crate::value::{Scalar, Value};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let cmd_type = command.command_type() as u8;

    let payload = match command {
        Command::Get { key } => to_payload(key)?,
        Command::Set { key, value } => to_payload(&(key, value))?,
        Command::Append { key, values } => to_payload(&(key, values))?,
        Command::SetAdd { key, member } => to_payload(&(key, member))?,
        Command::SetExists { key, member } => to_payload(&(key, member))?,
        Command::Ping | Command::Flush => Vec::new(),
    };

    Ok(frame(cmd_type, &payload))
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    let Some(cmd_type) = CommandType::from_byte(cmd_type) else {
        return Err(ChestError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        )));
    };

    match cmd_type {
        CommandType::Get => {
            let key: String = from_payload(payload, "GET")?;
            Ok(Command::Get { key })
        }
        CommandType::Set => {
            let (key, value): (String, Value) = from_payload(payload, "SET")?;
            value
                .check()
                .map_err(|e| ChestError::Protocol(format!("SET command: ill-formed value: {}", e)))?;
            Ok(Command::Set { key, value })
        }
        CommandType::Append => {
            let (key, values): (String, Vec<Scalar>) = from_payload(payload, "APPEND")?;
            Ok(Command::Append { key, values })
        }
        CommandType::SetAdd => {
            let (key, member): (String, Scalar) = from_payload(payload, "SADD")?;
            Ok(Command::SetAdd { key, member })
        }
        CommandType::SetExists => {
            let (key, member): (String, Scalar) = from_payload(payload, "SEXISTS")?;
            Ok(Command::SetExists { key, member })
        }
        CommandType::Ping => {
            expect_empty(payload, "PING")?;
            Ok(Command::Ping)
        }
        CommandType::Flush => {
            expect_empty(payload, "FLUSH")?;
            Ok(Command::Flush)
        }
    }
}

fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| ChestError::Serialization(format!("Failed to encode payload: {}", e)))
}

fn from_payload<T: DeserializeOwned>(payload: &[u8], name: &str) -> Result<T> {
    bincode::deserialize(payload)
        .map_err(|e| ChestError::Protocol(format!("{} command: malformed payload: {}", name, e)))
}

fn expect_empty(payload: &[u8], name: &str) -> Result<()> {
    if !payload.is_empty() {
        return Err(ChestError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            name,
            payload.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let Some(status) = Status::from_byte(status_byte) else {
        return Err(ChestError::Protocol(format!(
            "Unknown response status: 0x{:02x}",
            status_byte
        )));
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Split a complete frame into its kind byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(ChestError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..HEADER_SIZE])?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(ChestError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Read and bound-check the length field of a header
fn payload_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(ChestError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = payload_len(&header)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader)?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader)?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
