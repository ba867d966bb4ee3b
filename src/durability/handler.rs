//! Save failure handlers
//!
//! Saves run in the background, so their errors cannot be returned to the
//! caller whose write triggered them. They are delivered to the handler
//! installed on the store instead.

use std::sync::Arc;

use crate::config::SaveFailurePolicy;
use crate::error::ChestError;

/// Receives errors from failed snapshot saves
///
/// Called after the save lock is released, so a handler may retry with
/// `Store::save`.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, err: &ChestError);
}

/// Logs the failure and aborts the process
#[derive(Debug, Default, Clone, Copy)]
pub struct FatalHandler;

impl ErrorHandler for FatalHandler {
    fn handle(&self, err: &ChestError) {
        tracing::error!("Snapshot save failed, aborting: {}", err);
        std::process::abort();
    }
}

/// Logs the failure and keeps running; the store stays dirty and the
/// next trigger retries the save
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAndContinue;

impl ErrorHandler for LogAndContinue {
    fn handle(&self, err: &ChestError) {
        tracing::error!("Snapshot save failed, will retry: {}", err);
    }
}

impl<F> ErrorHandler for F
where
    F: Fn(&ChestError) + Send + Sync,
{
    fn handle(&self, err: &ChestError) {
        self(err)
    }
}

/// Build the handler selected by a config policy
pub fn handler_for(policy: SaveFailurePolicy) -> Arc<dyn ErrorHandler> {
    match policy {
        SaveFailurePolicy::Fatal => Arc::new(FatalHandler),
        SaveFailurePolicy::LogAndContinue => Arc::new(LogAndContinue),
    }
}
