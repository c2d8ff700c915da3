/// The seam between the sync engine and whatever renders the video.
///
/// Implementations wrap a concrete backend (libVLC, mpv, a browser
/// `<video>` element behind a bridge). Methods mirror the controls the
/// engine needs; errors are backend strings and never fatal to sync.
pub trait Player: Send + Sync {
    fn play(&self) -> Result<(), String>;

    fn pause(&self) -> Result<(), String>;

    /// Seek to an absolute position in seconds.
    fn seek(&self, seconds: f64) -> Result<(), String>;

    /// Current playback position in seconds.
    fn position(&self) -> Result<f64, String>;

    fn is_paused(&self) -> Result<bool, String>;
}
