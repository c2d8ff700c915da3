use std::time::{Duration, Instant};

use crate::protocol::{ControlAction, PlaybackState};

/// How long after an apply completes before locally-observed player events
/// may be emitted again. The player's own play/pause/seeked callbacks fire
/// as side-effects of applying an authoritative state; without this window
/// they would echo straight back to the room.
pub const APPLY_QUIESCENCE: Duration = Duration::from_millis(150);

/// Identical control payloads inside this window collapse into one.
pub const EMIT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Positions closer than this to the authoritative time are left alone on
/// apply; anything further gets a hard seek.
pub const DRIFT_THRESHOLD_SECS: f64 = 0.35;

const TIME_BUCKET_PER_SEC: f64 = 10.0;

/// What to do with an inbound authoritative state.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Newer than anything seen; install it in the player now.
    Apply(PlaybackState),
    /// Newer, but references a video the player has not loaded yet; held as
    /// the single pending state until the video becomes playable.
    Deferred,
    /// At or below the locally-observed version; dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
struct EmitKey {
    action: ControlAction,
    time_bucket: u64,
    is_playing: bool,
}

/// The viewer-side sync state machine. Versions are the only ordering
/// signal: inbound states are gated on them, and outbound intents are
/// suppressed while an apply (plus its quiescence window) is in flight.
///
/// Purely synchronous; the caller supplies `Instant`s, which keeps every
/// timing rule unit-testable.
pub struct SyncEngine {
    observed_version: u64,
    loaded_video: Option<String>,
    applying: bool,
    quiet_until: Option<Instant>,
    pending: Option<PlaybackState>,
    last_emit: Option<(EmitKey, Instant)>,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self {
            observed_version: 0,
            loaded_video: None,
            applying: false,
            quiet_until: None,
            pending: None,
            last_emit: None,
        }
    }

    pub fn observed_version(&self) -> u64 {
        self.observed_version
    }

    /// Gate an inbound authoritative state.
    pub fn admit(&mut self, state: PlaybackState) -> Admission {
        if state.version <= self.observed_version {
            tracing::trace!(
                version = state.version,
                observed = self.observed_version,
                "Dropping stale state"
            );
            return Admission::Stale;
        }
        self.observed_version = state.version;

        if self.loaded_video.as_deref() != Some(state.video_id.as_str()) {
            tracing::debug!(video = %state.video_id, "Deferring state for unloaded video");
            self.pending = Some(state);
            return Admission::Deferred;
        }
        Admission::Apply(state)
    }

    /// The named video reached a playable state. Returns the pending
    /// authoritative state to install, if one was waiting on it.
    pub fn video_ready(&mut self, video_id: &str) -> Option<PlaybackState> {
        self.loaded_video = Some(video_id.to_string());
        match self.pending.take() {
            Some(state) if state.video_id == video_id => Some(state),
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn begin_apply(&mut self) {
        self.applying = true;
    }

    pub fn finish_apply(&mut self, now: Instant) {
        self.applying = false;
        self.quiet_until = Some(now + APPLY_QUIESCENCE);
    }

    /// True while an apply is in flight or its quiescence window is open.
    pub fn is_locked(&self, now: Instant) -> bool {
        self.applying || self.quiet_until.is_some_and(|until| now < until)
    }

    /// Decide whether a local control intent may go out. Suppressed under
    /// the apply-lock; identical payloads (same action, same 100 ms time
    /// bucket, same liveness) collapse inside the debounce window.
    pub fn gate_emit(
        &mut self,
        action: ControlAction,
        current_time: f64,
        is_playing: bool,
        now: Instant,
    ) -> bool {
        if self.is_locked(now) {
            tracing::trace!(?action, "Suppressing control during apply");
            return false;
        }

        let key = EmitKey {
            action,
            time_bucket: (current_time.max(0.0) * TIME_BUCKET_PER_SEC).round() as u64,
            is_playing,
        };
        if let Some((last_key, at)) = &self.last_emit {
            if *last_key == key && now.duration_since(*at) < EMIT_DEBOUNCE {
                return false;
            }
        }
        self.last_emit = Some((key, now));
        true
    }

    /// Whether the local position has drifted far enough from the
    /// authoritative one to warrant a hard seek.
    pub fn needs_hard_seek(local: f64, authoritative: f64) -> bool {
        (local - authoritative).abs() > DRIFT_THRESHOLD_SECS
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}
