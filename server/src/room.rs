use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{
    ChatMessage, ControlAction, ControlRequest, PlaybackState, ServerMessage, UserInfo,
    VideoDescriptor,
};

const MAX_NICKNAME: usize = 20;

/// Per-member outbound queue. Enqueueing never blocks; a failed send means
/// the connection's pump task is gone and the member gets reaped.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug)]
struct Member {
    user_id: String,
    nickname: String,
    conn_id: Uuid,
    outbox: Outbox,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LeaveOutcome {
    NotMember,
    Left,
    /// The last member left; the caller must ask the registry to destroy
    /// this room. `defunct` is already set.
    LeftAndEmpty,
}

/// A coordination namespace: membership, chat ring, current-video pointer,
/// and the authoritative playback state under a monotonic version counter.
///
/// A `Room` is only ever mutated behind its registry `Mutex`, so every
/// method here runs inside the room's critical section and observes a total
/// order of requests. Broadcasts enqueue on member outboxes and never block.
pub struct Room {
    code: String,
    members: HashMap<String, Member>,
    chat: VecDeque<ChatMessage>,
    chat_cap: usize,
    join_slice: usize,
    current_video: Option<VideoDescriptor>,
    playback: Option<PlaybackState>,
    version: u64,
    created_at: u64,
    defunct: bool,
}

impl Room {
    pub fn new(code: String, chat_cap: usize, join_slice: usize) -> Self {
        Self {
            code,
            members: HashMap::new(),
            chat: VecDeque::new(),
            chat_cap,
            join_slice,
            current_video: None,
            playback: None,
            version: 0,
            created_at: now_millis(),
            defunct: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn user_count(&self) -> usize {
        self.members.len()
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn current_video(&self) -> Option<&VideoDescriptor> {
        self.current_video.as_ref()
    }

    pub fn playback(&self) -> Option<&PlaybackState> {
        self.playback.as_ref()
    }

    /// Set once the last member leaves. A caller that captured this room's
    /// `Arc` before the registry dropped it must not treat it as live.
    pub fn is_defunct(&self) -> bool {
        self.defunct
    }

    /// Admit a member. A prior handle with the same `user_id` is replaced;
    /// its connection is orphaned and cleans itself up on transport close.
    pub fn join(&mut self, user_id: &str, nickname: &str, conn_id: Uuid, outbox: Outbox) {
        let nickname: String = nickname.chars().take(MAX_NICKNAME).collect();

        let replaced = self.members.remove(user_id).is_some();
        if replaced {
            tracing::info!(room = %self.code, user = %user_id, "Replacing prior handle for rejoining user");
        }

        self.members.insert(
            user_id.to_string(),
            Member {
                user_id: user_id.to_string(),
                nickname: nickname.clone(),
                conn_id,
                outbox,
            },
        );

        // Snapshot first so the joiner starts from the state everyone else
        // has already observed, then announce to the rest.
        let snapshot = ServerMessage::RoomState {
            users: self.user_infos(),
            messages: self.chat_tail(),
            current_video: self.current_video.clone(),
            playback: self.playback.clone(),
        };
        let delivered = self
            .members
            .get(user_id)
            .map(|m| m.outbox.send(snapshot).is_ok())
            .unwrap_or(false);

        self.broadcast(
            ServerMessage::UserJoined {
                user: UserInfo {
                    id: user_id.to_string(),
                    nickname: nickname.clone(),
                },
                user_count: self.members.len(),
            },
            Some(user_id),
        );
        self.broadcast(
            ServerMessage::UserCountUpdate {
                count: self.members.len(),
            },
            Some(user_id),
        );

        self.system_message(format!("{} joined the room", nickname));

        if !delivered {
            self.reap_member(user_id);
        }
    }

    /// Remove a membership. When `conn_id` is given (synthetic leave on
    /// disconnect), the removal only applies if the member still belongs to
    /// that connection, so an orphaned connection cannot evict its
    /// replacement.
    pub fn leave(&mut self, user_id: &str, conn_id: Option<Uuid>) -> LeaveOutcome {
        match self.members.get(user_id) {
            None => return LeaveOutcome::NotMember,
            Some(member) => {
                if let Some(conn) = conn_id {
                    if member.conn_id != conn {
                        return LeaveOutcome::NotMember;
                    }
                }
            }
        }

        self.members.remove(user_id);
        self.broadcast(
            ServerMessage::UserLeft {
                user_id: user_id.to_string(),
                user_count: self.members.len(),
            },
            None,
        );
        self.broadcast(
            ServerMessage::UserCountUpdate {
                count: self.members.len(),
            },
            None,
        );

        if self.members.is_empty() {
            self.defunct = true;
            LeaveOutcome::LeftAndEmpty
        } else {
            LeaveOutcome::Left
        }
    }

    /// Mint a chat message with a server timestamp and fan it out to all
    /// members, the sender included. Text is untrusted and forwarded
    /// untouched; rendering clients escape it.
    pub fn chat(&mut self, user_id: &str, nickname: &str, text: String) {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            nickname: nickname.chars().take(MAX_NICKNAME).collect(),
            text,
            timestamp: now_millis(),
            system: false,
        };
        self.push_chat(message.clone());
        self.broadcast(ServerMessage::ChatMessage(message), None);
    }

    /// Declare the room's current video. Playback resets to paused at t=0
    /// under a fresh version; everyone except the sender gets the
    /// `video-loaded` broadcast, the sender gets an ack with the version.
    pub fn load_video(&mut self, user_id: &str, video: VideoDescriptor, reply: &Outbox) {
        self.version += 1;
        let state = PlaybackState {
            version: self.version,
            video_id: video.id.clone(),
            current_time: 0.0,
            is_playing: false,
            last_updated_by: user_id.to_string(),
            last_updated_at: now_millis(),
        };
        self.current_video = Some(video.clone());
        self.playback = Some(state.clone());

        let nickname = self
            .members
            .get(user_id)
            .map(|m| m.nickname.clone())
            .unwrap_or_else(|| user_id.to_string());

        self.broadcast(
            ServerMessage::VideoLoaded {
                video: video.clone(),
                state,
                user: UserInfo {
                    id: user_id.to_string(),
                    nickname: nickname.clone(),
                },
            },
            Some(user_id),
        );

        let _ = reply.send(ServerMessage::Ack {
            ok: true,
            version: Some(self.version),
            reason: None,
        });

        self.system_message(format!("{} loaded {}", nickname, video.name));
        tracing::info!(room = %self.code, user = %user_id, video = %video.id, version = self.version, "Video loaded");
    }

    /// Apply a playback control. Accepted iff the request's `videoId`
    /// matches the authoritative one; every accepted control bumps the
    /// version and is broadcast to all members, the originator included, so
    /// it can record the version it now owns.
    pub fn control(&mut self, req: &ControlRequest, reply: &Outbox) {
        let Some(playback) = self.playback.as_ref() else {
            self.reject(reply, "video-mismatch");
            return;
        };
        if playback.video_id != req.video_id {
            self.reject(reply, "video-mismatch");
            return;
        }

        let is_playing = match req.action {
            ControlAction::Play => true,
            ControlAction::Pause => false,
            ControlAction::Seek => req.is_playing.unwrap_or(playback.is_playing),
        };

        self.version += 1;
        let state = PlaybackState {
            version: self.version,
            video_id: req.video_id.clone(),
            current_time: req.current_time.max(0.0),
            is_playing,
            last_updated_by: req.user_id.clone(),
            last_updated_at: now_millis(),
        };
        self.playback = Some(state.clone());

        tracing::debug!(
            room = %self.code,
            user = %req.user_id,
            action = ?req.action,
            time = state.current_time,
            version = state.version,
            "Accepted control"
        );

        self.broadcast(ServerMessage::VideoControl { state }, None);
        let _ = reply.send(ServerMessage::Ack {
            ok: true,
            version: Some(self.version),
            reason: None,
        });
    }

    fn reject(&self, reply: &Outbox, reason: &str) {
        let _ = reply.send(ServerMessage::Ack {
            ok: false,
            version: None,
            reason: Some(reason.to_string()),
        });
    }

    fn user_infos(&self) -> Vec<UserInfo> {
        self.members
            .values()
            .map(|m| UserInfo {
                id: m.user_id.clone(),
                nickname: m.nickname.clone(),
            })
            .collect()
    }

    fn chat_tail(&self) -> Vec<ChatMessage> {
        let skip = self.chat.len().saturating_sub(self.join_slice);
        self.chat.iter().skip(skip).cloned().collect()
    }

    fn system_message(&mut self, text: String) {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            user_id: String::new(),
            nickname: String::new(),
            text,
            timestamp: now_millis(),
            system: true,
        };
        self.push_chat(message.clone());
        self.broadcast(ServerMessage::ChatMessage(message), None);
    }

    fn push_chat(&mut self, message: ChatMessage) {
        self.chat.push_back(message);
        while self.chat.len() > self.chat_cap {
            self.chat.pop_front();
        }
    }

    /// Enqueue `msg` on every member outbox except `except`. A failed send
    /// never aborts the fan-out; the dead connections are reaped afterwards.
    fn broadcast(&mut self, msg: ServerMessage, except: Option<&str>) {
        let dead: Vec<String> = self
            .members
            .values()
            .filter(|m| except != Some(m.user_id.as_str()))
            .filter(|m| m.outbox.send(msg.clone()).is_err())
            .map(|m| m.user_id.clone())
            .collect();

        for user_id in dead {
            self.reap_member(&user_id);
        }
    }

    fn reap_member(&mut self, user_id: &str) {
        if self.members.remove(user_id).is_some() {
            tracing::warn!(room = %self.code, user = %user_id, "Dropping member with closed connection");
            self.broadcast(
                ServerMessage::UserLeft {
                    user_id: user_id.to_string(),
                    user_count: self.members.len(),
                },
                None,
            );
            self.broadcast(
                ServerMessage::UserCountUpdate {
                    count: self.members.len(),
                },
                None,
            );
            if self.members.is_empty() {
                self.defunct = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn outbox() -> (Outbox, UnboundedReceiver<ServerMessage>) {
        mpsc::unbounded_channel()
    }

    fn test_room() -> Room {
        Room::new("ABCDEF".into(), 100, 50)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn descriptor(id: &str) -> VideoDescriptor {
        VideoDescriptor {
            id: id.to_string(),
            name: format!("{}.mp4", id),
            size: 1_000_000,
            mime_type: "video/mp4".into(),
            storage_key: id.to_string(),
        }
    }

    fn control_req(user: &str, video: &str, action: ControlAction, time: f64) -> ControlRequest {
        ControlRequest {
            room_code: "ABCDEF".into(),
            user_id: user.into(),
            video_id: video.into(),
            action,
            current_time: time,
            is_playing: None,
            client_sent_at: None,
        }
    }

    fn assert_ack_version(msg: &ServerMessage) -> u64 {
        match msg {
            ServerMessage::Ack {
                ok: true,
                version: Some(v),
                ..
            } => *v,
            other => panic!("expected ok ack, got {:?}", other),
        }
    }

    #[test]
    fn join_sends_snapshot_then_announces_to_peers() {
        let mut room = test_room();
        let (tx_a, mut rx_a) = outbox();
        let (tx_b, mut rx_b) = outbox();

        room.join("a", "Alice", Uuid::new_v4(), tx_a);
        let a_msgs = drain(&mut rx_a);
        assert!(matches!(a_msgs[0], ServerMessage::RoomState { .. }));

        room.join("b", "Bob", Uuid::new_v4(), tx_b);
        let b_msgs = drain(&mut rx_b);
        match &b_msgs[0] {
            ServerMessage::RoomState { users, .. } => assert_eq!(users.len(), 2),
            other => panic!("expected room-state first, got {:?}", other),
        }

        let a_msgs = drain(&mut rx_a);
        assert!(a_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::UserJoined { user, user_count: 2 } if user.id == "b"
        )));
        assert!(a_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::UserCountUpdate { count: 2 })));
        // Join announcement lands in chat for everyone.
        assert!(a_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::ChatMessage(c) if c.system && c.text.contains("Bob")
        )));
    }

    #[test]
    fn rejoin_replaces_prior_handle() {
        let mut room = test_room();
        let (tx_a1, _rx_a1) = outbox();
        let (tx_a2, mut rx_a2) = outbox();
        let (tx_b, mut rx_b) = outbox();

        room.join("a", "Alice", Uuid::new_v4(), tx_a1);
        room.join("b", "Bob", Uuid::new_v4(), tx_b);
        drain(&mut rx_b);

        room.join("a", "Alice", Uuid::new_v4(), tx_a2);
        assert_eq!(room.user_count(), 2);

        let b_msgs = drain(&mut rx_b);
        let joins = b_msgs
            .iter()
            .filter(|m| matches!(m, ServerMessage::UserJoined { user, .. } if user.id == "a"))
            .count();
        assert_eq!(joins, 1);
        assert!(!b_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::UserLeft { .. })));

        // The replacement handle is live.
        assert!(matches!(
            drain(&mut rx_a2)[0],
            ServerMessage::RoomState { .. }
        ));
    }

    #[test]
    fn stale_connection_cannot_remove_replacement() {
        let mut room = test_room();
        let conn_old = Uuid::new_v4();
        let conn_new = Uuid::new_v4();
        let (tx1, _rx1) = outbox();
        let (tx2, _rx2) = outbox();

        room.join("a", "Alice", conn_old, tx1);
        room.join("a", "Alice", conn_new, tx2);

        // Synthetic leave from the orphaned connection: a no-op.
        assert_eq!(room.leave("a", Some(conn_old)), LeaveOutcome::NotMember);
        assert_eq!(room.user_count(), 1);

        assert_eq!(room.leave("a", Some(conn_new)), LeaveOutcome::LeftAndEmpty);
        assert!(room.is_defunct());
    }

    #[test]
    fn leave_announces_and_reaps_empty_room() {
        let mut room = test_room();
        let (tx_a, _rx_a) = outbox();
        let (tx_b, mut rx_b) = outbox();

        room.join("a", "Alice", Uuid::new_v4(), tx_a);
        room.join("b", "Bob", Uuid::new_v4(), tx_b);
        drain(&mut rx_b);

        assert_eq!(room.leave("a", None), LeaveOutcome::Left);
        let b_msgs = drain(&mut rx_b);
        assert!(b_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::UserLeft { user_id, user_count: 1 } if user_id == "a"
        )));

        assert_eq!(room.leave("b", None), LeaveOutcome::LeftAndEmpty);
        assert!(room.is_defunct());
    }

    #[test]
    fn chat_history_is_bounded() {
        let mut room = Room::new("ABCDEF".into(), 5, 50);
        let (tx, mut rx) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx);
        drain(&mut rx);

        for i in 0..20 {
            room.chat("a", "Alice", format!("msg {}", i));
        }
        assert!(room.chat.len() <= 5);
        assert_eq!(room.chat.back().unwrap().text, "msg 19");
        assert_eq!(room.chat.front().unwrap().text, "msg 15");
    }

    #[test]
    fn chat_reaches_sender_too() {
        let mut room = test_room();
        let (tx_a, mut rx_a) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx_a);
        drain(&mut rx_a);

        room.chat("a", "Alice", "<b>hello</b>".into());
        let msgs = drain(&mut rx_a);
        match &msgs[0] {
            ServerMessage::ChatMessage(c) => {
                assert_eq!(c.user_id, "a");
                // Untrusted text passes through untouched.
                assert_eq!(c.text, "<b>hello</b>");
                assert!(!c.system);
            }
            other => panic!("expected chat, got {:?}", other),
        }
    }

    #[test]
    fn load_video_resets_playback_and_skips_sender_broadcast() {
        let mut room = test_room();
        let (tx_a, mut rx_a) = outbox();
        let (tx_b, mut rx_b) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx_a.clone());
        room.join("b", "Bob", Uuid::new_v4(), tx_b);
        drain(&mut rx_a);
        drain(&mut rx_b);

        room.load_video("a", descriptor("x"), &tx_a);

        let state = room.playback().unwrap().clone();
        assert_eq!(state.version, 1);
        assert_eq!(state.video_id, "x");
        assert_eq!(state.current_time, 0.0);
        assert!(!state.is_playing);
        assert_eq!(state.last_updated_by, "a");
        assert_eq!(room.current_video().unwrap().id, "x");

        let b_msgs = drain(&mut rx_b);
        assert!(b_msgs.iter().any(|m| matches!(
            m,
            ServerMessage::VideoLoaded { video, state, .. }
                if video.id == "x" && state.version == 1
        )));

        let a_msgs = drain(&mut rx_a);
        assert!(!a_msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::VideoLoaded { .. })));
        assert_eq!(assert_ack_version(&a_msgs[0]), 1);
    }

    #[test]
    fn control_for_other_video_is_rejected_without_mutation() {
        let mut room = test_room();
        let (tx_a, mut rx_a) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx_a.clone());
        room.load_video("a", descriptor("x"), &tx_a);
        drain(&mut rx_a);

        let before = room.playback().unwrap().clone();
        room.control(
            &control_req("a", "stale-video", ControlAction::Play, 5.0),
            &tx_a,
        );

        assert_eq!(room.playback().unwrap(), &before);
        let msgs = drain(&mut rx_a);
        match &msgs[0] {
            ServerMessage::Ack {
                ok: false,
                reason: Some(reason),
                ..
            } => assert_eq!(reason, "video-mismatch"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn control_before_any_video_is_rejected() {
        let mut room = test_room();
        let (tx, mut rx) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx.clone());
        drain(&mut rx);

        room.control(&control_req("a", "x", ControlAction::Play, 0.0), &tx);
        assert!(room.playback().is_none());
        assert!(matches!(
            drain(&mut rx)[0],
            ServerMessage::Ack { ok: false, .. }
        ));
    }

    #[test]
    fn play_pause_and_seek_semantics() {
        let mut room = test_room();
        let (tx, mut rx) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx.clone());
        room.load_video("a", descriptor("x"), &tx);
        drain(&mut rx);

        room.control(&control_req("a", "x", ControlAction::Play, 12.0), &tx);
        let state = room.playback().unwrap();
        assert!(state.is_playing);
        assert_eq!(state.current_time, 12.0);

        // Seek while playing stays playing.
        room.control(&control_req("a", "x", ControlAction::Seek, 90.0), &tx);
        let state = room.playback().unwrap();
        assert!(state.is_playing);
        assert_eq!(state.current_time, 90.0);

        room.control(&control_req("a", "x", ControlAction::Pause, 91.0), &tx);
        assert!(!room.playback().unwrap().is_playing);

        // Seek while paused stays paused.
        room.control(&control_req("a", "x", ControlAction::Seek, 10.0), &tx);
        assert!(!room.playback().unwrap().is_playing);

        // An explicit liveness flag on a seek wins over inheritance.
        let mut req = control_req("a", "x", ControlAction::Seek, 20.0);
        req.is_playing = Some(true);
        room.control(&req, &tx);
        assert!(room.playback().unwrap().is_playing);
    }

    #[test]
    fn versions_strictly_increase_and_repeats_get_fresh_versions() {
        let mut room = test_room();
        let (tx, mut rx) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx.clone());
        room.load_video("a", descriptor("x"), &tx);
        drain(&mut rx);

        room.control(&control_req("a", "x", ControlAction::Pause, 12.3), &tx);
        let v1 = room.playback().unwrap().version;
        room.control(&control_req("a", "x", ControlAction::Pause, 12.3), &tx);
        let v2 = room.playback().unwrap().version;

        assert!(v2 > v1);
        assert!(!room.playback().unwrap().is_playing);

        // The member observed every version in increasing order.
        let mut last = 0;
        for msg in drain(&mut rx) {
            if let ServerMessage::VideoControl { state } = msg {
                assert!(state.version > last);
                last = state.version;
            }
        }
        assert_eq!(last, v2);
    }

    #[test]
    fn pause_after_play_serialises_to_two_versions() {
        let mut room = test_room();
        let (tx_a, mut rx_a) = outbox();
        let (tx_b, mut rx_b) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx_a.clone());
        room.join("b", "Bob", Uuid::new_v4(), tx_b.clone());
        room.load_video("a", descriptor("x"), &tx_a);
        drain(&mut rx_a);
        drain(&mut rx_b);

        // "Simultaneous" controls: the coordinator observes some order.
        room.control(&control_req("a", "x", ControlAction::Play, 30.0), &tx_a);
        room.control(&control_req("b", "x", ControlAction::Pause, 30.1), &tx_b);

        let final_state = room.playback().unwrap().clone();
        assert_eq!(final_state.version, 3);
        assert!(!final_state.is_playing);
        assert_eq!(final_state.last_updated_by, "b");

        // Both members saw both broadcasts ending at the same state.
        for rx in [&mut rx_a, &mut rx_b] {
            let versions: Vec<u64> = drain(rx)
                .into_iter()
                .filter_map(|m| match m {
                    ServerMessage::VideoControl { state } => Some(state.version),
                    _ => None,
                })
                .collect();
            assert_eq!(versions, vec![2, 3]);
        }
    }

    #[test]
    fn dead_member_is_swept_on_broadcast() {
        let mut room = test_room();
        let (tx_a, mut rx_a) = outbox();
        let (tx_b, rx_b) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx_a);
        room.join("b", "Bob", Uuid::new_v4(), tx_b);
        drain(&mut rx_a);

        // B's pump task is gone.
        drop(rx_b);
        room.chat("a", "Alice", "anyone there?".into());

        assert_eq!(room.user_count(), 1);
        let msgs = drain(&mut rx_a);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::UserLeft { user_id, .. } if user_id == "b"
        )));
    }

    #[test]
    fn late_joiner_gets_playback_in_snapshot() {
        let mut room = test_room();
        let (tx_a, _rx_a) = outbox();
        room.join("a", "Alice", Uuid::new_v4(), tx_a.clone());
        room.load_video("a", descriptor("x"), &tx_a);
        room.control(&control_req("a", "x", ControlAction::Play, 42.0), &tx_a);

        let (tx_b, mut rx_b) = outbox();
        room.join("b", "Bob", Uuid::new_v4(), tx_b);
        match &drain(&mut rx_b)[0] {
            ServerMessage::RoomState {
                playback: Some(state),
                current_video: Some(video),
                ..
            } => {
                assert_eq!(state.version, 2);
                assert_eq!(state.current_time, 42.0);
                assert!(state.is_playing);
                assert_eq!(video.id, "x");
            }
            other => panic!("expected populated snapshot, got {:?}", other),
        }
    }

    #[test]
    fn nickname_is_clamped() {
        let mut room = test_room();
        let (tx, mut rx) = outbox();
        room.join("a", &"x".repeat(64), Uuid::new_v4(), tx);
        match &drain(&mut rx)[0] {
            ServerMessage::RoomState { users, .. } => {
                assert_eq!(users[0].nickname.chars().count(), 20)
            }
            other => panic!("expected room-state, got {:?}", other),
        }
    }
}
