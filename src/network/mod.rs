//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept polling a shutdown flag)
//! - One worker thread per connection, bounded by `max_connections`
//! - Commands routed through Engine

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::Server;
