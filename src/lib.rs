//! # ChestKV
//!
//! A single-node, in-memory key-value store with:
//! - Typed values: scalars, sequences and sets, shape fixed on first write
//! - Concurrent access behind a single RwLock
//! - Debounced background snapshots with atomic file replacement
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │              (Command routing, lifecycle)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  notify   ┌─────────────┐
//!   │    Store    │ ────────► │  Scheduler  │
//!   │  (RwLock)   │ ◄──────── │  (thread)   │
//!   └─────────────┘   save    └──────┬──────┘
//!                                    │
//!                                    ▼
//!                            ┌─────────────┐
//!                            │  Snapshot   │
//!                            │ (tmp+rename)│
//!                            └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod durability;
pub mod engine;
pub mod network;
pub mod protocol;
pub mod store;
pub mod value;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, SaveFailurePolicy};
pub use durability::{ErrorHandler, FatalHandler, LogAndContinue};
pub use engine::Engine;
pub use error::{ChestError, Result};
pub use store::Store;
pub use value::{ElemTag, Scalar, Shape, ShapeError, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ChestKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
