//! Command definitions
//!
//! Represents commands from clients.

use crate::value::{Scalar, Value};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Append = 0x03,
    SetAdd = 0x04,
    SetExists = 0x05,
    Ping = 0x06,
    Flush = 0x07,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandType::Get),
            0x02 => Some(CommandType::Set),
            0x03 => Some(CommandType::Append),
            0x04 => Some(CommandType::SetAdd),
            0x05 => Some(CommandType::SetExists),
            0x06 => Some(CommandType::Ping),
            0x07 => Some(CommandType::Flush),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Get a value by key
    Get { key: String },

    /// Overwrite a key with any value
    Set { key: String, value: Value },

    /// Append scalars to a sequence
    Append { key: String, values: Vec<Scalar> },

    /// Add a member to a set
    SetAdd { key: String, member: Scalar },

    /// Test set membership
    SetExists { key: String, member: Scalar },

    /// Ping (health check)
    Ping,

    /// Force a synchronous snapshot save
    Flush,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Append { .. } => CommandType::Append,
            Command::SetAdd { .. } => CommandType::SetAdd,
            Command::SetExists { .. } => CommandType::SetExists,
            Command::Ping => CommandType::Ping,
            Command::Flush => CommandType::Flush,
        }
    }

    /// The key this command addresses, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::Append { key, .. }
            | Command::SetAdd { key, .. }
            | Command::SetExists { key, .. } => Some(key),
            Command::Ping | Command::Flush => None,
        }
    }
}
