//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::ChimeCue;
use crate::config::Config;
use pomodoro_core::ports::{CompletionCue, SilentCue};
use pomodoro_core::{PomodoroTimer, TaskStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TaskStore>,
    /// The single timer instance every client observes and drives.
    pub timer: PomodoroTimer,
    /// `None` when chimes are disabled.
    pub chime: Option<Arc<ChimeCue>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the timer to the store and to the chime (or to silence).
    pub fn new(store: Arc<TaskStore>, config: Arc<Config>, chime: Option<Arc<ChimeCue>>) -> Self {
        let cue: Arc<dyn CompletionCue> = match &chime {
            Some(chime) => chime.clone(),
            None => Arc::new(SilentCue),
        };
        let timer = PomodoroTimer::new(store.clone(), cue);
        Self {
            store,
            timer,
            chime,
            config,
        }
    }
}
