use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages consumed from clients, one JSON object per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinRoom {
        room_code: String,
        user_id: String,
        nickname: String,
    },
    LeaveRoom {
        room_code: String,
        user_id: String,
    },
    ChatMessage {
        room_code: String,
        user_id: String,
        nickname: String,
        text: String,
    },
    VideoLoaded {
        room_code: String,
        user_id: String,
        video: VideoDescriptor,
    },
    VideoControl(ControlRequest),
}

/// Messages emitted to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Sent once to a joining connection.
    RoomState {
        users: Vec<UserInfo>,
        messages: Vec<ChatMessage>,
        current_video: Option<VideoDescriptor>,
        playback: Option<PlaybackState>,
    },
    UserJoined {
        user: UserInfo,
        user_count: usize,
    },
    UserLeft {
        user_id: String,
        user_count: usize,
    },
    UserCountUpdate {
        count: usize,
    },
    ChatMessage(ChatMessage),
    VideoLoaded {
        video: VideoDescriptor,
        state: PlaybackState,
        user: UserInfo,
    },
    VideoControl {
        state: PlaybackState,
    },
    /// Acknowledgement to the originator of a `video-loaded` or
    /// `video-control` request, carrying the assigned version on success.
    Ack {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Error {
        message: String,
    },
}

/// A request to advance the room's playback state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub room_code: String,
    pub user_id: String,
    pub video_id: String,
    pub action: ControlAction,
    pub current_time: f64,
    /// Play and pause imply liveness; seek inherits the authoritative value
    /// when the payload leaves this unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_sent_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Play,
    Pause,
    Seek,
}

/// The pointer a room is "watching". `storage_key` is the name the bytes
/// live under in the media store; it equals `id` for uploads minted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_key: String,
}

/// The authoritative playback tuple. `version` is the only ordering signal
/// clients trust; it is strictly increasing over a room's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub version: u64,
    pub video_id: String,
    pub current_time: f64,
    pub is_playing: bool,
    pub last_updated_by: String,
    pub last_updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: String,
    pub nickname: String,
    pub text: String,
    pub timestamp: u64,
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub nickname: String,
}
