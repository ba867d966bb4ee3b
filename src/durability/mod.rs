//! Durability Module
//!
//! Decides when the store is written to disk.
//!
//! ## Policy
//! - A change notification saves immediately unless the last save happened
//!   within the debounce window (default 1 s)
//! - A periodic tick (default 1 s) saves whenever the store is dirty
//! - A stop request performs one final synchronous save
//!
//! A burst of writes inside one window therefore costs at most one save
//! beyond the periodic tick, and the file is never more than about one
//! window behind memory.
//!
//! ## Failure Handling
//! Save errors go to the store's [`ErrorHandler`]. The default
//! [`FatalHandler`] aborts the process; [`LogAndContinue`] keeps the store
//! dirty so the next trigger retries.

mod handler;
mod scheduler;

pub use handler::{handler_for, ErrorHandler, FatalHandler, LogAndContinue};
pub use scheduler::{Scheduler, THREAD_NAME};
