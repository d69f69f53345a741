//! Observers for analyzer progress.
//!
//! Observers receive every [`AnalysisSnapshot`] after a chunk and the final
//! [`AnalysisReport`]. They only read; nothing they do feeds back into the
//! analysis.
//!
//! ```text
//! ProgressObserver trait
//!        │
//!        ├── LogObserver (log facade, console)
//!        └── JsonLinesObserver (one JSON object per snapshot)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ObserverRegistry::new();
//! registry.register(Box::new(LogObserver::new()));
//! let handle = start_analysis(battle, settings, Box::new(ReducedRolls), registry)?;
//! ```

pub mod console;
pub mod json;

use crate::analyze::{AnalysisReport, AnalysisSnapshot};
use thiserror::Error;

pub use self::console::LogObserver;
pub use self::json::JsonLinesObserver;

/// Errors that can occur during observation.
#[derive(Error, Debug)]
pub enum ObserverError {
    /// I/O error (e.g., writing to a file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error (e.g., JSON output)
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Rendering/formatting error
    #[error("Render error: {0}")]
    Render(String),
    /// Observer channel disconnected
    #[error("Observer disconnected")]
    Disconnected,
}

/// Trait for analysis observers.
///
/// Errors returned from the callbacks are logged but never stop the
/// analysis. Implementations must be `Send + Sync` because the registry
/// moves onto the analysis worker thread.
pub trait ProgressObserver: Send + Sync {
    /// Called after every chunk.
    fn on_progress(&self, snapshot: &AnalysisSnapshot) -> Result<(), ObserverError>;

    /// Called once with the final report.
    fn on_finish(&self, _report: &AnalysisReport) -> Result<(), ObserverError> {
        Ok(())
    }

    /// Human-readable name for logging/debugging.
    fn name(&self) -> &str;

    /// Called when the registry is dropped.
    fn on_shutdown(&self) {}
}

/// Heterogeneous set of observers notified in registration order.
pub struct ObserverRegistry {
    observers: Vec<Box<dyn ProgressObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self { observers: vec![] }
    }

    pub fn register(&mut self, observer: Box<dyn ProgressObserver>) {
        log::info!("Registered observer: {}", observer.name());
        self.observers.push(observer);
    }

    /// Errors are logged but do not propagate.
    pub fn notify(&self, snapshot: &AnalysisSnapshot) {
        for observer in &self.observers {
            if let Err(e) = observer.on_progress(snapshot) {
                log::warn!("Observer '{}' error: {}", observer.name(), e);
            }
        }
    }

    pub fn finish(&self, report: &AnalysisReport) {
        for observer in &self.observers {
            if let Err(e) = observer.on_finish(report) {
                log::warn!("Observer '{}' error: {}", observer.name(), e);
            }
        }
    }

    pub fn shutdown(&self) {
        for observer in &self.observers {
            observer.on_shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObserverRegistry {
    fn drop(&mut self) {
        // Flush buffered writers
        self.shutdown();
    }
}
