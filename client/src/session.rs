use std::time::Instant;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use uuid::Uuid;

use crate::engine::{Admission, SyncEngine};
use crate::player::Player;
use crate::protocol::{
    ClientMessage, ControlAction, ControlRequest, PlaybackState, ServerMessage, VideoDescriptor,
};

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A six-character shareable room code, uppercase alphanumeric.
pub fn generate_room_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(6)
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}

/// One viewer's connection to the coordination hub.
///
/// Holds the identity the server echoes back (client-asserted, stable
/// across reconnects), the current room, and the [`SyncEngine`] that gates
/// everything crossing the wire in either direction.
pub struct SyncSession {
    tx: Mutex<Option<mpsc::UnboundedSender<ClientMessage>>>,
    engine: Mutex<SyncEngine>,
    user_id: String,
    nickname: String,
    room_code: Mutex<Option<String>>,
}

impl SyncSession {
    pub fn new(user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            tx: Mutex::new(None),
            engine: Mutex::new(SyncEngine::new()),
            user_id: user_id.into(),
            nickname: nickname.into(),
            room_code: Mutex::new(None),
        }
    }

    /// A session with a fresh random identity.
    pub fn with_generated_identity(nickname: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), nickname)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn room_code(&self) -> Option<String> {
        self.room_code.lock().clone()
    }

    /// Connect to the sync server
    pub async fn connect<F>(&self, server_url: &str, on_message: F) -> Result<()>
    where
        F: Fn(ServerMessage) + Send + 'static,
    {
        let (ws_stream, _) = connect_async(server_url)
            .await
            .context("Failed to connect to server")?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();

        *self.tx.lock() = Some(tx);

        // Spawn send task
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if ws_sender.send(WsMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
        });

        // Spawn receive task
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                if let Ok(WsMessage::Text(text)) = msg {
                    if let Ok(parsed) = serde_json::from_str::<ServerMessage>(&text) {
                        on_message(parsed);
                    }
                }
            }
        });

        Ok(())
    }

    /// Join a room by code. The server case-folds; we do the same so the
    /// session's idea of "current room" matches its broadcasts.
    pub fn join_room(&self, code: &str) -> Result<()> {
        let code = code.trim().to_ascii_uppercase();
        *self.room_code.lock() = Some(code.clone());
        self.send_message(ClientMessage::JoinRoom {
            room_code: code,
            user_id: self.user_id.clone(),
            nickname: self.nickname.clone(),
        })
    }

    /// Leave the current room
    pub fn leave_room(&self) -> Result<()> {
        let Some(code) = self.room_code.lock().take() else {
            return Ok(());
        };
        self.send_message(ClientMessage::LeaveRoom {
            room_code: code,
            user_id: self.user_id.clone(),
        })
    }

    pub fn send_chat(&self, text: impl Into<String>) -> Result<()> {
        let Some(code) = self.room_code() else {
            return Ok(());
        };
        self.send_message(ClientMessage::ChatMessage {
            room_code: code,
            user_id: self.user_id.clone(),
            nickname: self.nickname.clone(),
            text: text.into(),
        })
    }

    /// Declare the room's current video (e.g. after an upload finished).
    pub fn announce_video(&self, video: VideoDescriptor) -> Result<()> {
        let Some(code) = self.room_code() else {
            return Ok(());
        };
        self.engine.lock().video_ready(&video.id);
        self.send_message(ClientMessage::VideoLoaded {
            room_code: code,
            user_id: self.user_id.clone(),
            video,
        })
    }

    /// Emit a local control intent. Returns `Ok(false)` when the engine
    /// swallowed it (apply-lock or debounce); liveness is always explicit
    /// in the payload, the server never has to infer it.
    pub fn emit_control(
        &self,
        video_id: &str,
        action: ControlAction,
        current_time: f64,
        is_playing: bool,
    ) -> Result<bool> {
        let Some(code) = self.room_code() else {
            return Ok(false);
        };
        if !self
            .engine
            .lock()
            .gate_emit(action, current_time, is_playing, Instant::now())
        {
            return Ok(false);
        }

        self.send_message(ClientMessage::VideoControl(ControlRequest {
            room_code: code,
            user_id: self.user_id.clone(),
            video_id: video_id.to_string(),
            action,
            current_time,
            is_playing: Some(is_playing),
            client_sent_at: Some(now_millis()),
        }))?;
        Ok(true)
    }

    /// Install an inbound authoritative state, subject to the version gate
    /// and pending buffer.
    pub fn apply_remote_state<P: Player>(&self, player: &P, state: PlaybackState) {
        let admission = self.engine.lock().admit(state);
        match admission {
            Admission::Apply(state) => self.install(player, &state),
            Admission::Deferred | Admission::Stale => {}
        }
    }

    /// The local player finished loading `video_id`; install whatever
    /// authoritative state was waiting on it.
    pub fn video_ready<P: Player>(&self, player: &P, video_id: &str) {
        let pending = self.engine.lock().video_ready(video_id);
        if let Some(state) = pending {
            self.install(player, &state);
        }
    }

    fn install<P: Player>(&self, player: &P, state: &PlaybackState) {
        self.engine.lock().begin_apply();

        let local = player.position().unwrap_or(0.0);
        if SyncEngine::needs_hard_seek(local, state.current_time) {
            if let Err(e) = player.seek(state.current_time) {
                tracing::warn!(error = %e, "Seek failed while applying state");
            }
        }

        let result = if state.is_playing {
            player.play()
        } else {
            player.pause()
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Transport control failed while applying state");
        }

        self.engine.lock().finish_apply(Instant::now());
    }

    fn send_message(&self, msg: ClientMessage) -> Result<()> {
        if let Some(tx) = self.tx.lock().as_ref() {
            tx.send(msg).context("Failed to send message")?;
        }
        Ok(())
    }
}
