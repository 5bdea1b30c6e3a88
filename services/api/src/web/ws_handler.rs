//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a timer WebSocket connection.
//! Client intents are applied to the shared `PomodoroTimer`; timer notifications and
//! completion chimes are forwarded back by a separate task.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use bytes::Bytes;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use pomodoro_core::{TimerEvent, TimerMode};
use std::sync::Arc;
use tokio::sync::{broadcast, broadcast::error::RecvError, Mutex};
use tracing::{debug, error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New timer WebSocket connection established.");

    // The sender is shared between this loop (direct replies) and the forwarding task.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Subscribe, then send the current state ---
    let events = app_state.timer.subscribe();
    let chimes = app_state.chime.as_ref().map(|chime| chime.subscribe());
    let snapshot = app_state.timer.snapshot().await;
    if send_message(&ws_sender, &ServerMessage::State { timer: snapshot.into() })
        .await
        .is_err()
    {
        error!("Failed to send initial timer state.");
        return;
    }

    let forward_task = tokio::spawn(forward_notifications(events, chimes, ws_sender.clone()));

    // --- 2. Main Message Loop ---
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(text.as_str().to_string(), &app_state, &ws_sender).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    forward_task.abort();
    info!("Timer WebSocket connection closed.");
}

/// Applies one client intent to the timer. Outcomes reach every client through the
/// timer's notifications; only malformed input is answered directly.
async fn handle_text_message(text: String, app_state: &Arc<AppState>, ws_sender: &WsSender) {
    let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            reply_error(ws_sender, format!("Unrecognized message: {}", e)).await;
            return;
        }
    };

    let timer = &app_state.timer;
    match client_msg {
        ClientMessage::SelectMode { mode } => match mode.parse::<TimerMode>() {
            Ok(mode) => timer.select_mode(mode).await,
            Err(e) => reply_error(ws_sender, e.to_string()).await,
        },
        ClientMessage::Start => {
            if let Err(e) = timer.start().await {
                debug!("Start rejected: {}", e);
            }
        }
        ClientMessage::Pause => timer.pause().await,
        ClientMessage::Toggle => {
            if let Err(e) = timer.toggle().await {
                debug!("Toggle rejected: {}", e);
            }
        }
        ClientMessage::Reset => timer.reset().await,
        ClientMessage::CompleteNow => {
            if let Err(e) = timer.complete_now().await {
                debug!("Complete-now rejected: {}", e);
            }
        }
        ClientMessage::BindTask { task_id: None } => timer.bind_task(None).await,
        ClientMessage::BindTask {
            task_id: Some(task_id),
        } => match app_state.store.get_task(&task_id).await {
            Ok(task) => timer.bind_task(Some(task.id)).await,
            Err(e) => {
                warn!(task_id = %task_id, "Cannot bind task: {}", e);
                reply_error(ws_sender, e.to_string()).await;
            }
        },
    }
}

/// Pushes timer notifications as JSON text frames and chimes as binary frames.
async fn forward_notifications(
    mut events: broadcast::Receiver<TimerEvent>,
    mut chimes: Option<broadcast::Receiver<Bytes>>,
    ws_sender: WsSender,
) {
    loop {
        let message = tokio::select! {
            event = events.recv() => match event {
                Ok(event) => match serde_json::to_string(&ServerMessage::from(event)) {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        error!("Failed to encode timer notification: {}", e);
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Client fell behind timer notifications.");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            chime = next_chime(&mut chimes) => Message::Binary(chime),
        };

        if ws_sender.lock().await.send(message).await.is_err() {
            debug!("Client gone; stopping notification forwarding.");
            break;
        }
    }
}

/// Next chime, or never when chimes are disabled.
async fn next_chime(chimes: &mut Option<broadcast::Receiver<Bytes>>) -> Bytes {
    if let Some(rx) = chimes {
        loop {
            match rx.recv().await {
                Ok(wav) => return wav,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }
    std::future::pending().await
}

async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    ws_sender.lock().await.send(Message::Text(json.into())).await
}

async fn reply_error(ws_sender: &WsSender, message: String) {
    if send_message(ws_sender, &ServerMessage::Error { message }).await.is_err() {
        error!("Failed to send error message.");
    }
}
