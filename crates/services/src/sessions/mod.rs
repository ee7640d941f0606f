mod countdown;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use countdown::{CancelReason, CancelSignal, Countdown, PauseOutcome, pause};
pub use progress::SessionProgress;
pub use service::{
    Advance, AnswerOutcome, LEVEL_DOWN_MISSES, LEVEL_UP_STREAK, LevelChange, QuizSession,
    SessionStatus,
};
pub use workflow::{LoopStep, SessionLoopService};
