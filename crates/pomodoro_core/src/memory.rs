//! crates/pomodoro_core/src/memory.rs
//!
//! A volatile `StateRepository` kept entirely in process memory.
//! Used by tests and by setups that do not need the document to survive a restart.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::StoreState;
use crate::ports::{PortError, PortResult, StateRepository};

#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<StoreState>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing document.
    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Makes every following `save` fail with an I/O error until switched off again.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateRepository for InMemoryRepository {
    async fn load(&self) -> PortResult<StoreState> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &StoreState) -> PortResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PortError::Io("simulated write failure".to_string()));
        }
        *self.state.lock().await = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
