#![forbid(unsafe_code)]

pub mod error;
pub mod profile_service;
pub mod sessions;
pub mod settings_service;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{ProfileError, SessionError, SettingsServiceError};
pub use profile_service::{ProfileOverview, ProfileService};
pub use settings_service::SettingsService;

pub use sessions::{
    Advance, AnswerOutcome, CancelReason, CancelSignal, Countdown, LevelChange, LoopStep,
    QuizSession, SessionLoopService, SessionProgress, SessionStatus,
};
