//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the timer.

use crate::web::rest::{TaskResponse, TimerSnapshotResponse};
use pomodoro_core::TimerEvent;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The user intents a client can send to the timer.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Switches to `focus`, `short` or `long`; stops and rewinds the countdown.
    SelectMode { mode: String },

    /// Starts the countdown. Rejected with `no_task_selected` when no task is bound.
    Start,

    Pause,

    /// Start when paused, pause when running.
    Toggle,

    /// Stops and rewinds the current mode.
    Reset,

    /// Credits the bound task right away. Focus mode only.
    CompleteNow,

    /// Binds the task that receives credit; a missing or null id unbinds.
    BindTask {
        #[serde(default)]
        task_id: Option<String>,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// NOTE: The completion chime is sent as a raw Binary frame (WAV), not as part of this enum.
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Full timer state. Sent on connect and after every transition.
    State { timer: TimerSnapshotResponse },

    Tick { remaining_seconds: u32 },

    /// A countdown reached zero.
    Finished { mode: String },

    /// A focus session was credited to `task`.
    FocusCompleted { task: TaskResponse, manual: bool },

    NoTaskSelected,

    /// Something went wrong; the client should show `message` as a notification.
    Error { message: String },
}

impl From<TimerEvent> for ServerMessage {
    fn from(event: TimerEvent) -> Self {
        match event {
            TimerEvent::State(snapshot) => ServerMessage::State {
                timer: snapshot.into(),
            },
            TimerEvent::Tick { remaining_seconds } => ServerMessage::Tick { remaining_seconds },
            TimerEvent::Finished { mode } => ServerMessage::Finished {
                mode: mode.to_string(),
            },
            TimerEvent::FocusCompleted { task, manual } => ServerMessage::FocusCompleted {
                task: task.into(),
                manual,
            },
            TimerEvent::NoTaskSelected => ServerMessage::NoTaskSelected,
            TimerEvent::Error { message } => ServerMessage::Error { message },
        }
    }
}
