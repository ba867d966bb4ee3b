//! Background save scheduler
//!
//! One thread per store, reacting to three events:
//!
//! ```text
//!   stop ──────────► final save, exit
//!   notification ──► save if the last save is older than the debounce window
//!   tick ──────────► save if the store is dirty
//! ```

use std::io;
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{ChestError, Result};
use crate::store::Store;

/// Name of the scheduler thread
pub const THREAD_NAME: &str = "chestkv-saver";

/// Handle to a running scheduler thread
pub struct Scheduler {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the scheduler for `store`
    ///
    /// The scheduler only holds a weak reference; it exits on its own if the
    /// store is dropped.
    pub fn spawn(
        store: Weak<Store>,
        notifications: Receiver<()>,
        debounce_window: Duration,
        flush_interval: Duration,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded(1);

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                run(store, notifications, stop_rx, debounce_window, flush_interval);
            })?;

        Ok(Self {
            stop: stop_tx,
            handle,
        })
    }

    /// Request the final save and block until the thread has exited
    pub fn stop(self) -> Result<()> {
        // A full or closed channel both mean the thread is already stopping
        let _ = self.stop.try_send(());
        self.handle.join().map_err(|_| {
            ChestError::Io(io::Error::new(
                io::ErrorKind::Other,
                "durability thread panicked",
            ))
        })
    }
}

/// What woke the scheduler up
enum Event {
    /// Stop requested (or the engine went away)
    Stop,
    /// A mutation happened
    Changed,
    /// Periodic tick
    Tick,
    /// The store dropped its notification sender
    Detached,
}

fn run(
    store: Weak<Store>,
    notifications: Receiver<()>,
    stop: Receiver<()>,
    debounce_window: Duration,
    flush_interval: Duration,
) {
    let ticker = channel::tick(flush_interval);
    tracing::debug!(
        debounce_ms = debounce_window.as_millis() as u64,
        interval_ms = flush_interval.as_millis() as u64,
        "Durability scheduler started"
    );

    loop {
        let event = crossbeam::select! {
            recv(stop) -> _ => Event::Stop,
            recv(notifications) -> msg => match msg {
                Ok(()) => Event::Changed,
                Err(_) => Event::Detached,
            },
            recv(ticker) -> _ => Event::Tick,
        };

        let Some(store) = store.upgrade() else { break };

        match event {
            Event::Stop => {
                tracing::debug!("Final save before shutdown");
                let _ = store.save();
                break;
            }
            Event::Changed => {
                let due = store
                    .last_save()
                    .map_or(true, |at| at.elapsed() > debounce_window);
                if due {
                    let _ = store.save();
                }
            }
            Event::Tick => {
                if store.is_dirty() {
                    let _ = store.save();
                }
            }
            Event::Detached => break,
        }
    }

    tracing::debug!("Durability scheduler stopped");
}
