//! TCP Client
//!
//! Blocking client speaking the ChestKV wire protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{ChestError, Result};
use crate::protocol::{read_response, write_command, Command};
use crate::value::{Scalar, Value};

/// A connection to a ChestKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ChestError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Overwrite (or create) `key`
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.call(Command::Set {
            key: key.to_string(),
            value: value.into(),
        })
        .map(|_| ())
    }

    /// Get the value under `key`
    pub fn get(&mut self, key: &str) -> Result<Value> {
        self.call(Command::Get {
            key: key.to_string(),
        })?
        .ok_or_else(|| ChestError::Protocol("GET response carried no value".to_string()))
    }

    /// Append values to the sequence under `key`
    pub fn append<I>(&mut self, key: &str, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        self.call(Command::Append {
            key: key.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        })
        .map(|_| ())
    }

    /// Add a member to the set under `key`
    pub fn set_add(&mut self, key: &str, member: impl Into<Scalar>) -> Result<()> {
        self.call(Command::SetAdd {
            key: key.to_string(),
            member: member.into(),
        })
        .map(|_| ())
    }

    /// Succeeds if `member` is in the set under `key`
    pub fn set_exists(&mut self, key: &str, member: impl Into<Scalar>) -> Result<()> {
        self.call(Command::SetExists {
            key: key.to_string(),
            member: member.into(),
        })
        .map(|_| ())
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        self.call(Command::Ping).map(|_| ())
    }

    /// Ask the server to save a snapshot now
    pub fn flush(&mut self) -> Result<()> {
        self.call(Command::Flush).map(|_| ())
    }

    /// Send one command and wait for its response
    pub fn call(&mut self, command: Command) -> Result<Option<Value>> {
        let key = command.key().unwrap_or_default().to_string();
        write_command(&mut self.writer, &command)?;
        let response = read_response(&mut self.reader)?;
        response.into_result(&key)
    }
}
