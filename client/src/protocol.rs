use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent to the server (must match server protocol)
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

/// Messages received from the server (must match server protocol)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub room_code: String,
    pub user_id: String,
    pub video_id: String,
    pub action: ControlAction,
    pub current_time: f64,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_key: String,
}

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
