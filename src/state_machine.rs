/// Top-level client state driven by the push-to-talk gesture.
///
/// `Idle -> Listening` on press, `Listening -> Processing` on release with a
/// captured transcript, `Processing -> Speaking` once the answer arrives, and
/// back to `Idle` when playback finishes or anything fails. Busy states
/// (`Processing`, `Speaking`) drop new press gestures instead of queueing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl SystemState {
    /// Wire name used in UI status messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemState::Idle => "idle",
            SystemState::Listening => "listening",
            SystemState::Processing => "processing",
            SystemState::Speaking => "speaking",
        }
    }
}
