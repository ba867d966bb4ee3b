//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{ChestError, Result};
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A connection thread and a handle on its socket for waking it up
struct Worker {
    stream: TcpStream,
    handle: JoinHandle<()>,
}

/// TCP server for ChestKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
    workers: Mutex<Vec<Worker>>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            ChestError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        // Non-blocking accept so the loop can observe the shutdown flag
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the server (blocking until `shutdown` is called)
    ///
    /// Returns only after every connection thread has exited, so no request
    /// is still being served once this returns.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    self.join_workers();
                    return Err(e.into());
                }
            }
        }

        tracing::info!("Server on {} shutting down", self.local_addr);
        self.join_workers();
        Ok(())
    }

    /// Close every open connection and wait for its thread
    fn join_workers(&self) {
        let workers: Vec<Worker> = self.workers.lock().drain(..).collect();
        if !workers.is_empty() {
            tracing::debug!("Waiting for {} connection threads", workers.len());
        }
        for worker in workers {
            // Unblocks a thread waiting in read; a request in flight still completes
            let _ = worker.stream.shutdown(Shutdown::Both);
            if worker.handle.join().is_err() {
                tracing::warn!("Connection thread panicked");
            }
        }
    }

    /// Hand an accepted stream to a worker thread
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        // Accepted sockets may inherit non-blocking mode on some platforms
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", peer, e);
            return;
        }

        let active = self.active_connections.fetch_add(1, Ordering::AcqRel) + 1;
        if active > self.config.max_connections {
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(
                "Refusing {}: {} connections already open",
                peer,
                self.config.max_connections
            );
            let mut stream = stream;
            let _ = write_response(&mut stream, &Response::error("too many connections"));
            return;
        }

        let waker = match stream.try_clone() {
            Ok(waker) => waker,
            Err(e) => {
                self.active_connections.fetch_sub(1, Ordering::AcqRel);
                tracing::warn!("Dropping connection from {}: {}", peer, e);
                return;
            }
        };

        let engine = Arc::clone(&self.engine);
        let counter = Arc::clone(&self.active_connections);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("chestkv-conn-{}", peer))
            .spawn(move || {
                let result = Connection::new(stream, engine).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} ended with error: {}", peer, e);
                }
                counter.fetch_sub(1, Ordering::AcqRel);
            });

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock();
                workers.retain(|w| !w.handle.is_finished());
                workers.push(Worker {
                    stream: waker,
                    handle,
                });
            }
            Err(e) => {
                self.active_connections.fetch_sub(1, Ordering::AcqRel);
                tracing::error!("Failed to spawn worker for {}: {}", peer, e);
            }
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// A flag that stops the accept loop when set (for signal handlers)
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    /// Get the engine
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}
