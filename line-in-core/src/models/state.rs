/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle ⇄ recording
///   ↓        ↓
///     closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Closed,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
