use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Attempt, DisplayName, Level, OPTION_COUNT, Question, QuizMode, QuizSettings, SessionId,
    SessionSummary, UserId, UserProfile,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Data needed to register a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub display_name: DisplayName,
    pub created_at: DateTime<Utc>,
}

/// Data needed to open a session record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSession {
    pub user_id: Option<UserId>,
    pub mode: QuizMode,
    pub total_questions: u32,
    pub timer_seconds: u32,
    pub started_at: DateTime<Utc>,
}

/// Persisted shape of a session, open or finished.
///
/// `summary` is present once the session has completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: Option<UserId>,
    pub mode: QuizMode,
    pub total_questions: u32,
    pub timer_seconds: u32,
    pub started_at: DateTime<Utc>,
    pub summary: Option<SessionSummary>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_new(id: SessionId, new: NewSession) -> Self {
        Self {
            id,
            user_id: new.user_id,
            mode: new.mode,
            total_questions: new.total_questions,
            timer_seconds: new.timer_seconds,
            started_at: new.started_at,
            summary: None,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.summary.is_some()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.summary.as_ref().map_or(0, SessionSummary::final_score)
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.summary.as_ref().map_or(0.0, SessionSummary::accuracy)
    }
}

/// Leaderboard order: score desc, then accuracy desc, then earliest start.
pub(crate) fn leaderboard_order(a: &SessionRecord, b: &SessionRecord) -> Ordering {
    b.score()
        .cmp(&a.score())
        .then_with(|| b.accuracy().total_cmp(&a.accuracy()))
        .then_with(|| a.started_at.cmp(&b.started_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// A generated question as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRecord {
    pub session_id: SessionId,
    pub question_index: u32,
    pub level: Level,
    pub expression: String,
    pub correct_answer: i64,
    pub options: [i64; OPTION_COUNT],
    pub correct_index: usize,
    pub created_at: DateTime<Utc>,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question, question_index: u32, at: DateTime<Utc>) -> Self {
        Self {
            session_id: question.session_id(),
            question_index,
            level: question.level(),
            expression: question.expression().to_owned(),
            correct_answer: question.correct_answer(),
            options: *question.options(),
            correct_index: question.correct_index(),
            created_at: at,
        }
    }
}

/// One graded answer, keyed by the question it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub session_id: SessionId,
    pub question_index: u32,
    pub selected_index: usize,
    pub correct: bool,
    pub answer_time_ms: u64,
    pub answered_at: DateTime<Utc>,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_attempt(
        session_id: SessionId,
        question_index: u32,
        attempt: &Attempt,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            question_index,
            selected_index: attempt.selected_index,
            correct: attempt.correct,
            answer_time_ms: attempt.answer_time_ms,
            answered_at: at,
        }
    }
}

/// Repository contract for session lifecycles and the leaderboard.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Open a session record and assign its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn create_session(&self, new: NewSession) -> Result<SessionId, StorageError>;

    /// Attach the final summary to an open session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown sessions and
    /// `StorageError::Conflict` if the session already completed.
    async fn complete_session(
        &self,
        id: SessionId,
        summary: &SessionSummary,
    ) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError>;

    /// Most recent sessions first, optionally for one user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn list_sessions(
        &self,
        user_id: Option<UserId>,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError>;

    /// Completed sessions ordered by score, then accuracy.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn top_sessions(
        &self,
        limit: u32,
        user_id: Option<UserId>,
    ) -> Result<Vec<SessionRecord>, StorageError>;
}

/// Fire-and-forget sink for generated questions and answers.
#[async_trait]
pub trait QuizRecordSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn record_question(&self, question: &QuestionRecord) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Attempts in answer order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn attempts_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Per-user quiz settings.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Returns `None` when the user has never saved settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if stored values cannot be read or validated.
    async fn get_settings(&self, user_id: UserId) -> Result<Option<QuizSettings>, StorageError>;

    /// Insert or replace the user's settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(
        &self,
        user_id: UserId,
        settings: &QuizSettings,
    ) -> Result<(), StorageError>;
}

/// Player profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a player and assign its ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn create_user(&self, new: NewUser) -> Result<UserProfile, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such profile exists.
    async fn get_user(&self, id: UserId) -> Result<UserProfile, StorageError>;

    /// All profiles, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn list_users(&self) -> Result<Vec<UserProfile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such profile exists.
    async fn rename_user(
        &self,
        id: UserId,
        display_name: &DisplayName,
    ) -> Result<UserProfile, StorageError>;

    /// Remove a profile together with its sessions, questions, attempts and
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such profile exists.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<BTreeMap<UserId, UserProfile>>>,
    sessions: Arc<Mutex<BTreeMap<SessionId, SessionRecord>>>,
    questions: Arc<Mutex<Vec<QuestionRecord>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
    settings: Arc<Mutex<HashMap<UserId, QuizSettings>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions recorded for a session, in generation order.
    ///
    /// Test support: lets integration tests inspect what a session loop
    /// recorded. The `QuizRecordSink` contract has no read path for questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn questions_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionRecord>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|q| q.session_id == session_id)
            .cloned()
            .collect())
    }
}

fn row_id(len: usize) -> Result<i64, StorageError> {
    i64::try_from(len).map_err(|_| StorageError::Serialization("row id overflow".into()))
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, new: NewSession) -> Result<SessionId, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = SessionId::new(next);
        guard.insert(id, SessionRecord::from_new(id, new));
        Ok(id)
    }

    async fn complete_session(
        &self,
        id: SessionId,
        summary: &SessionSummary,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        if record.is_completed() {
            return Err(StorageError::Conflict);
        }
        record.summary = Some(summary.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_sessions(
        &self,
        user_id: Option<UserId>,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<SessionRecord> = guard
            .values()
            .filter(|s| user_id.is_none() || s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn top_sessions(
        &self,
        limit: u32,
        user_id: Option<UserId>,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<SessionRecord> = guard
            .values()
            .filter(|s| s.is_completed())
            .filter(|s| user_id.is_none() || s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(leaderboard_order);
        out.truncate(limit as usize);
        Ok(out)
    }
}

#[async_trait]
impl QuizRecordSink for InMemoryRepository {
    async fn record_question(&self, question: &QuestionRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let duplicate = guard.iter().any(|q| {
            q.session_id == question.session_id && q.question_index == question.question_index
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }
        guard.push(question.clone());
        row_id(guard.len())
    }

    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let known = {
            let questions = self
                .questions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            questions.iter().any(|q| {
                q.session_id == attempt.session_id && q.question_index == attempt.question_index
            })
        };
        if !known {
            return Err(StorageError::NotFound);
        }

        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(attempt.clone());
        row_id(guard.len())
    }

    async fn attempts_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self, user_id: UserId) -> Result<Option<QuizSettings>, StorageError> {
        let guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&user_id).cloned())
    }

    async fn save_settings(
        &self,
        user_id: UserId,
        settings: &QuizSettings,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(user_id, settings.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create_user(&self, new: NewUser) -> Result<UserProfile, StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let profile = UserProfile::new(UserId::new(next), new.display_name, new.created_at);
        guard.insert(profile.id(), profile.clone());
        Ok(profile)
    }

    async fn get_user(&self, id: UserId) -> Result<UserProfile, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn rename_user(
        &self,
        id: UserId,
        display_name: &DisplayName,
    ) -> Result<UserProfile, StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let profile = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        profile.rename(display_name.clone());
        Ok(profile.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if users.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let owned: Vec<SessionId> = sessions
            .values()
            .filter(|s| s.user_id == Some(id))
            .map(|s| s.id)
            .collect();
        sessions.retain(|_, s| s.user_id != Some(id));
        self.questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .retain(|q| !owned.contains(&q.session_id));
        self.attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .retain(|a| !owned.contains(&a.session_id));
        self.settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .remove(&id);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub records: Arc<dyn QuizRecordSink>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    /// Every repository served by one backend.
    pub fn from_backend<R>(backend: R) -> Self
    where
        R: UserRepository
            + SessionRepository
            + QuizRecordSink
            + SettingsRepository
            + Clone
            + 'static,
    {
        Self {
            users: Arc::new(backend.clone()),
            sessions: Arc::new(backend.clone()),
            records: Arc::new(backend.clone()),
            settings: Arc::new(backend),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }
}
