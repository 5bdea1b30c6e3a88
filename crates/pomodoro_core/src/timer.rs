//! crates/pomodoro_core/src/timer.rs
//!
//! The Pomodoro timer.
//!
//! `TimerState` is the pure state machine (mode, countdown, running flag, bound task).
//! `PomodoroTimer` drives it: a cancellable one-second tick worker, the focus-complete
//! side effect against the `TaskStore`, and a broadcast channel of `TimerEvent`s for the
//! presentation layer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{Task, TimerMode, TimerSnapshot};
use crate::ports::{CompletionCue, PortError};
use crate::store::TaskStore;

const TICK_PERIOD: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("No task selected")]
    NoTaskSelected,
    #[error("Completing early is only possible in focus mode")]
    NotFocusMode,
    #[error("Update failed: {0}")]
    Store(#[from] PortError),
}

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The timer was not running; nothing changed.
    Idle,
    /// One second elapsed, this many remain.
    Counting(u32),
    /// The countdown reached zero and the timer stopped.
    Finished(TimerMode),
}

//=========================================================================================
// State Machine
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining_seconds: u32,
    pub running: bool,
    /// Non-owning reference to the task that receives credit.
    pub active_task_id: Option<String>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            mode: TimerMode::Focus,
            remaining_seconds: TimerMode::Focus.duration_secs(),
            running: false,
            active_task_id: None,
        }
    }
}

impl TimerState {
    /// Switches mode from any state: stops and rewinds to the new mode's duration.
    pub fn select_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.running = false;
        self.remaining_seconds = mode.duration_secs();
    }

    /// Starts the countdown. Requires a bound task.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.active_task_id.is_none() {
            return Err(TimerError::NoTaskSelected);
        }
        if self.remaining_seconds == 0 {
            self.remaining_seconds = self.mode.duration_secs();
        }
        self.running = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Flips between running and paused, returning the new running flag.
    pub fn toggle(&mut self) -> Result<bool, TimerError> {
        if self.running {
            self.pause();
        } else {
            self.start()?;
        }
        Ok(self.running)
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_seconds = self.mode.duration_secs();
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.running = false;
            Tick::Finished(self.mode)
        } else {
            Tick::Counting(self.remaining_seconds)
        }
    }

    /// Binding never stops a running countdown.
    pub fn bind_task(&mut self, task_id: Option<String>) {
        self.active_task_id = task_id;
    }

    /// Applied after a focus session was credited: stop and move to a short break.
    pub fn finish_focus(&mut self) {
        self.select_mode(TimerMode::Short);
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            remaining_seconds: self.remaining_seconds,
            running: self.running,
            active_task_id: self.active_task_id.clone(),
        }
    }
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone)]
pub enum TimerEvent {
    /// Sent after every transition.
    State(TimerSnapshot),
    Tick { remaining_seconds: u32 },
    /// The countdown of `mode` reached zero.
    Finished { mode: TimerMode },
    FocusCompleted { task: Task, manual: bool },
    NoTaskSelected,
    Error { message: String },
}

//=========================================================================================
// Driver
//=========================================================================================

struct Inner {
    state: TimerState,
    /// Token of the current tick worker. Cancelled whenever the countdown stops.
    ticker: CancellationToken,
}

struct Shared {
    inner: Mutex<Inner>,
    store: Arc<TaskStore>,
    cue: Arc<dyn CompletionCue>,
    events: broadcast::Sender<TimerEvent>,
}

impl Shared {
    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_state(&self, inner: &Inner) {
        self.emit(TimerEvent::State(inner.state.snapshot()));
    }

    fn play_cue(&self) {
        let cue = self.cue.clone();
        tokio::spawn(async move {
            if let Err(e) = cue.play().await {
                debug!("Completion cue failed: {}", e);
            }
        });
    }

    async fn complete_focus(
        &self,
        inner: &mut Inner,
        task_id: &str,
        manual: bool,
    ) -> Result<Task, TimerError> {
        match self.store.record_pomodoro(task_id).await {
            Ok(task) => {
                inner.ticker.cancel();
                inner.state.finish_focus();
                info!(task_id = %task.id, pomodoros = task.pomodoros, manual, "Focus session completed.");
                self.emit(TimerEvent::FocusCompleted {
                    task: task.clone(),
                    manual,
                });
                Ok(task)
            }
            Err(e) => {
                inner.ticker.cancel();
                inner.state.pause();
                error!(task_id = %task_id, "Failed to credit focus session: {}", e);
                let err = TimerError::Store(e);
                self.emit(TimerEvent::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// The single timer instance. Cheap to clone; all clones drive the same countdown.
#[derive(Clone)]
pub struct PomodoroTimer {
    shared: Arc<Shared>,
}

impl PomodoroTimer {
    pub fn new(store: Arc<TaskStore>, cue: Arc<dyn CompletionCue>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: TimerState::default(),
                    ticker: CancellationToken::new(),
                }),
                store,
                cue,
                events,
            }),
        }
    }

    /// Registers a new observer of timer notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.shared.inner.lock().await.state.snapshot()
    }

    pub async fn select_mode(&self, mode: TimerMode) {
        let mut inner = self.shared.inner.lock().await;
        inner.ticker.cancel();
        inner.state.select_mode(mode);
        info!(mode = %mode, "Timer mode selected.");
        self.shared.emit_state(&inner);
    }

    pub async fn start(&self) -> Result<(), TimerError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.running {
            return Ok(());
        }
        self.start_locked(&mut inner)
    }

    pub async fn pause(&self) {
        let mut inner = self.shared.inner.lock().await;
        self.pause_locked(&mut inner);
    }

    /// Start/pause in one intent. Returns the new running flag.
    pub async fn toggle(&self) -> Result<bool, TimerError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.running {
            self.pause_locked(&mut inner);
            Ok(false)
        } else {
            self.start_locked(&mut inner).map(|_| true)
        }
    }

    pub async fn reset(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.ticker.cancel();
        inner.state.reset();
        debug!("Timer reset.");
        self.shared.emit_state(&inner);
    }

    /// Binds (or with `None` unbinds) the task that receives credit.
    pub async fn bind_task(&self, task_id: Option<String>) {
        let mut inner = self.shared.inner.lock().await;
        debug!(task_id = ?task_id, "Timer task bound.");
        inner.state.bind_task(task_id);
        self.shared.emit_state(&inner);
    }

    /// Unbinds the active task if it is one of `task_ids`. Returns whether it was.
    pub async fn release_tasks(&self, task_ids: &[String]) -> bool {
        let mut inner = self.shared.inner.lock().await;
        let bound = match inner.state.active_task_id.as_ref() {
            Some(id) => task_ids.contains(id),
            None => false,
        };
        if bound {
            info!("Bound task was deleted; unbinding it from the timer.");
            inner.state.bind_task(None);
            self.shared.emit_state(&inner);
        }
        bound
    }

    /// Credits the bound task immediately, regardless of the remaining time.
    pub async fn complete_now(&self) -> Result<Task, TimerError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.state.mode != TimerMode::Focus {
            let err = TimerError::NotFocusMode;
            self.shared.emit(TimerEvent::Error {
                message: err.to_string(),
            });
            return Err(err);
        }
        let Some(task_id) = inner.state.active_task_id.clone() else {
            self.shared.emit(TimerEvent::NoTaskSelected);
            return Err(TimerError::NoTaskSelected);
        };

        self.shared.play_cue();
        let result = self
            .shared
            .complete_focus(&mut inner, &task_id, true)
            .await;
        self.shared.emit_state(&inner);
        result
    }

    fn start_locked(&self, inner: &mut Inner) -> Result<(), TimerError> {
        if let Err(e) = inner.state.start() {
            warn!("Refusing to start the timer: {}", e);
            self.shared.emit(TimerEvent::NoTaskSelected);
            return Err(e);
        }

        inner.ticker.cancel();
        let token = CancellationToken::new();
        inner.ticker = token.clone();
        tokio::spawn(run_ticker(self.shared.clone(), token));

        info!(mode = %inner.state.mode, remaining = inner.state.remaining_seconds, "Timer started.");
        self.shared.emit_state(inner);
        Ok(())
    }

    fn pause_locked(&self, inner: &mut Inner) {
        inner.ticker.cancel();
        inner.state.pause();
        info!(remaining = inner.state.remaining_seconds, "Timer paused.");
        self.shared.emit_state(inner);
    }
}

/// The tick worker. One per started countdown; exits when its token is cancelled or
/// the countdown finishes.
async fn run_ticker(shared: Arc<Shared>, token: CancellationToken) {
    let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Tick worker cancelled.");
                return;
            }
            _ = interval.tick() => {}
        }

        let mut inner = shared.inner.lock().await;
        // A stop may have landed while this tick waited for the lock.
        if token.is_cancelled() {
            return;
        }

        match inner.state.tick() {
            Tick::Idle => return,
            Tick::Counting(remaining_seconds) => {
                shared.emit(TimerEvent::Tick { remaining_seconds });
            }
            Tick::Finished(mode) => {
                token.cancel();
                info!(mode = %mode, "Countdown finished.");
                shared.emit(TimerEvent::Tick {
                    remaining_seconds: 0,
                });
                shared.emit(TimerEvent::Finished { mode });
                shared.play_cue();

                if mode == TimerMode::Focus {
                    match inner.state.active_task_id.clone() {
                        Some(task_id) => {
                            // Failures are reported to subscribers inside.
                            let _ = shared.complete_focus(&mut inner, &task_id, false).await;
                        }
                        None => {
                            warn!("Focus countdown finished with no task bound.");
                            shared.emit(TimerEvent::NoTaskSelected);
                        }
                    }
                }
                shared.emit_state(&inner);
                return;
            }
        }
    }
}
