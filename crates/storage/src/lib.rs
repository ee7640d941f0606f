#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRecord, InMemoryRepository, NewSession, NewUser, QuestionRecord, QuizRecordSink,
    SessionRecord, SessionRepository, SettingsRepository, Storage, StorageError, UserRepository,
};
pub use sqlite::{DatabaseLocation, SqliteInitError, SqliteRepository};
