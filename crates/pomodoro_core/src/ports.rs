//! crates/pomodoro_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the JSON file store
//! or the audio chime.

use async_trait::async_trait;

use crate::domain::StoreState;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and store operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A required field was empty or invalid. Reported to the caller as a client error.
    #[error("{0}")]
    Validation(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Loading or saving the persisted document failed.
    #[error("I/O error: {0}")]
    Io(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Synchronous-from-the-caller load/save pair over the whole document.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Returns the persisted collections, or empty ones when nothing was saved yet.
    async fn load(&self) -> PortResult<StoreState>;

    /// Replaces the persisted document. On error the previous document must be intact.
    async fn save(&self, state: &StoreState) -> PortResult<()>;
}

/// Audible/visual notification fired when a countdown ends or a session is completed early.
///
/// Fire-and-forget: callers ignore failures.
#[async_trait]
pub trait CompletionCue: Send + Sync {
    async fn play(&self) -> PortResult<()>;
}

/// A cue that does nothing, for headless setups.
pub struct SilentCue;

#[async_trait]
impl CompletionCue for SilentCue {
    async fn play(&self) -> PortResult<()> {
        Ok(())
    }
}
