use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::{LeaveOutcome, Outbox, Room};
use crate::AppState;

/// The room membership a connection currently holds. A connection is in at
/// most one room; the gateway uses this only to route and to synthesize a
/// leave on transport close, never to read room fields.
struct Membership {
    code: String,
    user_id: String,
}

pub async fn ws_endpoint(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    let conn_short = conn_id.to_string()[..8].to_string();

    tracing::info!("↗ Connection opened [{}]", conn_short);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Pump task: drains this connection's outbox into the socket. Room
    // coordinators only ever enqueue; per-connection backpressure and write
    // failures stay out of their critical sections.
    let pump_short = conn_short.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("[{}] Failed to serialize message: {}", pump_short, e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(WsMessage::Text(json)).await {
                tracing::debug!("[{}] Write failed, closing pump: {}", pump_short, e);
                break;
            }
        }
    });

    let mut membership: Option<Membership> = None;

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                handle_frame(&text, conn_id, &tx, &mut membership, &state.registry).await;
            }
            Ok(WsMessage::Close(_)) => {
                tracing::info!("↙ Connection closed [{}]", conn_short);
                break;
            }
            Err(e) => {
                tracing::warn!("[{}] WebSocket error: {}", conn_short, e);
                break;
            }
            _ => {}
        }
    }

    // Transport gone: synthesize a leave for whatever membership this
    // connection still holds.
    if let Some(m) = membership.take() {
        leave_room(&state.registry, &m.code, &m.user_id, Some(conn_id)).await;
    }
    send_task.abort();
}

async fn handle_frame(
    text: &str,
    conn_id: Uuid,
    tx: &Outbox,
    membership: &mut Option<Membership>,
    registry: &RoomRegistry,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed frame");
            return;
        }
    };

    match msg {
        ClientMessage::JoinRoom {
            room_code,
            user_id,
            nickname,
        } => {
            let Some(code) = RoomRegistry::normalize_code(&room_code) else {
                let _ = tx.send(ServerMessage::Error {
                    message: format!("Invalid room code: {}", room_code),
                });
                return;
            };

            // One membership per connection: joining elsewhere leaves the
            // old room first. A re-join of the same room is handled by the
            // coordinator's replace path and must not reap the room.
            if let Some(prev) = membership.take() {
                if prev.code != code || prev.user_id != user_id {
                    leave_room(registry, &prev.code, &prev.user_id, Some(conn_id)).await;
                }
            }

            loop {
                let arc = registry.join_or_create(&code);
                let mut room = arc.lock().await;
                if room.is_defunct() {
                    // Lost the race against the reaper; clear the stale
                    // mapping and retry.
                    drop(room);
                    registry.destroy(&code, &arc);
                    continue;
                }
                room.join(&user_id, &nickname, conn_id, tx.clone());
                break;
            }

            *membership = Some(Membership { code, user_id });
        }

        ClientMessage::LeaveRoom { room_code, user_id } => {
            let Some(code) = RoomRegistry::normalize_code(&room_code) else {
                return;
            };
            if membership
                .as_ref()
                .is_some_and(|m| m.code == code && m.user_id == user_id)
            {
                *membership = None;
            }
            leave_room(registry, &code, &user_id, Some(conn_id)).await;
        }

        ClientMessage::ChatMessage {
            room_code,
            user_id,
            nickname,
            text,
        } => {
            let Some(code) = RoomRegistry::normalize_code(&room_code) else {
                return;
            };
            let routed = with_live_room(registry, &code, |room| {
                room.chat(&user_id, &nickname, text);
            })
            .await;
            if !routed {
                tracing::debug!(room = %code, "Dropping chat for unknown room");
            }
        }

        ClientMessage::VideoLoaded {
            room_code,
            user_id,
            video,
        } => {
            let Some(code) = RoomRegistry::normalize_code(&room_code) else {
                let _ = tx.send(ServerMessage::Ack {
                    ok: false,
                    version: None,
                    reason: Some("bad-request".into()),
                });
                return;
            };
            let routed = with_live_room(registry, &code, |room| {
                room.load_video(&user_id, video, tx);
            })
            .await;
            if !routed {
                let _ = tx.send(ServerMessage::Ack {
                    ok: false,
                    version: None,
                    reason: Some("not-found".into()),
                });
            }
        }

        ClientMessage::VideoControl(req) => {
            let Some(code) = RoomRegistry::normalize_code(&req.room_code) else {
                let _ = tx.send(ServerMessage::Ack {
                    ok: false,
                    version: None,
                    reason: Some("bad-request".into()),
                });
                return;
            };
            let routed = with_live_room(registry, &code, |room| {
                room.control(&req, tx);
            })
            .await;
            if !routed {
                let _ = tx.send(ServerMessage::Ack {
                    ok: false,
                    version: None,
                    reason: Some("not-found".into()),
                });
            }
        }
    }
}

async fn with_live_room<F>(registry: &RoomRegistry, code: &str, f: F) -> bool
where
    F: FnOnce(&mut Room),
{
    match registry.get(code) {
        Some(arc) => {
            let mut room = arc.lock().await;
            if room.is_defunct() {
                false
            } else {
                f(&mut room);
                true
            }
        }
        None => false,
    }
}

async fn leave_room(registry: &RoomRegistry, code: &str, user_id: &str, conn_id: Option<Uuid>) {
    if let Some(arc) = registry.get(code) {
        let mut room = arc.lock().await;
        if room.is_defunct() {
            return;
        }
        if room.leave(user_id, conn_id) == LeaveOutcome::LeftAndEmpty {
            registry.destroy(code, &arc);
        }
    }
}
