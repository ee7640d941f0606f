use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tracing::{info, warn};

use quiz_core::model::{QuizSettings, SessionSummary, UserId};
use storage::repository::{
    AttemptRecord, NewSession, QuestionRecord, QuizRecordSink, SessionRepository,
};

use super::countdown::{CancelReason, CancelSignal, PauseOutcome, pause};
use super::service::{Advance, AnswerOutcome, QuizSession};
use crate::Clock;
use crate::error::SessionError;

/// What happened after the pause between questions.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopStep {
    Next(Advance),
    Abandoned,
}

/// Orchestrates a session against storage: session records, the question and
/// attempt sink, answer timing and the auto-advance pause.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    records: Arc<dyn QuizRecordSink>,
    user_id: Option<UserId>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        records: Arc<dyn QuizRecordSink>,
    ) -> Self {
        Self {
            clock,
            sessions,
            records,
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Advance a fixed clock, e.g. to simulate answer time in tests.
    pub fn advance_clock(&mut self, delta: chrono::Duration) {
        self.clock.advance(delta);
    }

    /// Open a session record and start the state machine.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the record cannot be created.
    pub async fn start_session(&self, settings: &QuizSettings) -> Result<QuizSession, SessionError> {
        let started_at = self.clock.now();
        let id = self
            .sessions
            .create_session(NewSession {
                user_id: self.user_id,
                mode: settings.mode(),
                total_questions: settings.questions_per_session(),
                timer_seconds: settings.timer_seconds(),
                started_at,
            })
            .await?;
        info!(
            session = %id,
            mode = %settings.mode(),
            questions = settings.questions_per_session(),
            timer_seconds = settings.timer_seconds(),
            "session started"
        );
        Ok(QuizSession::start(id, settings.clone(), started_at))
    }

    /// Pull the next question, or finish the session.
    ///
    /// A session past its deadline is expired instead of advanced.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for state machine failures or when the final
    /// summary cannot be persisted.
    pub async fn next_question(
        &self,
        session: &mut QuizSession,
        rng: &mut dyn RngCore,
    ) -> Result<Advance, SessionError> {
        let now = self.clock.now();
        if session.is_expired(now) {
            return self.expire(session).await.map(Advance::Completed);
        }

        let step = session.advance(rng, now)?;
        match &step {
            Advance::Question(question) => {
                let index = session.state().question_index;
                let record = QuestionRecord::from_question(question, index, now);
                if let Err(err) = self.records.record_question(&record).await {
                    warn!(session = %session.id(), index, %err, "failed to record question");
                }
            }
            Advance::Completed(summary) => {
                self.persist_summary(session, summary).await?;
            }
        }
        Ok(step)
    }

    /// Answer the pending question, timing it with the service clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session rejects the answer.
    pub async fn answer_current(
        &self,
        session: &mut QuizSession,
        selected_index: usize,
    ) -> Result<AnswerOutcome, SessionError> {
        let now = self.clock.now();
        let elapsed_ms = session
            .presented_at()
            .map_or(0, |shown| self.clock.elapsed_ms(shown));
        let outcome = session.submit_answer(selected_index, elapsed_ms)?;

        let index = outcome.state.question_index;
        let record = AttemptRecord::from_attempt(session.id(), index, &outcome.attempt, now);
        if let Err(err) = self.records.record_attempt(&record).await {
            warn!(session = %session.id(), index, %err, "failed to record attempt");
        }
        if let Some(change) = outcome.level_change {
            info!(session = %session.id(), ?change, "level changed");
        }
        Ok(outcome)
    }

    /// Wait the auto-advance delay, then move on.
    ///
    /// A raised `signal` cuts the pause short: `TimeExpired` completes the
    /// session, `Abandoned` cancels it. The session is not touched while
    /// waiting.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` from the follow-up step.
    pub async fn pause_then_next(
        &self,
        session: &mut QuizSession,
        rng: &mut dyn RngCore,
        signal: &CancelSignal,
    ) -> Result<LoopStep, SessionError> {
        let delay = Duration::from_millis(u64::from(session.settings().auto_advance_ms()));
        match pause(delay, signal).await {
            PauseOutcome::Elapsed => self.next_question(session, rng).await.map(LoopStep::Next),
            PauseOutcome::Cancelled(CancelReason::TimeExpired) => self
                .expire(session)
                .await
                .map(|summary| LoopStep::Next(Advance::Completed(summary))),
            PauseOutcome::Cancelled(CancelReason::Abandoned) => {
                self.abandon(session)?;
                Ok(LoopStep::Abandoned)
            }
        }
    }

    /// Finish the session because its time ran out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session already ended or the summary
    /// cannot be persisted.
    pub async fn expire(&self, session: &mut QuizSession) -> Result<SessionSummary, SessionError> {
        let summary = session.expire(self.clock.now())?;
        self.persist_summary(session, &summary).await?;
        Ok(summary)
    }

    /// Leave the session; its record stays open without a summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session already ended.
    pub fn abandon(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.abandon()?;
        info!(session = %session.id(), answered = session.state().answered(), "session abandoned");
        Ok(())
    }

    /// Retry summary persistence after a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session has no summary yet.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_summary(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        if session.summary_persisted() {
            return Ok(());
        }
        let summary = session.summary().cloned().ok_or(SessionError::Completed)?;
        self.persist_summary(session, &summary).await
    }

    async fn persist_summary(
        &self,
        session: &mut QuizSession,
        summary: &SessionSummary,
    ) -> Result<(), SessionError> {
        self.sessions.complete_session(session.id(), summary).await?;
        session.mark_summary_persisted();
        info!(
            session = %session.id(),
            score = summary.final_score(),
            accuracy = summary.accuracy(),
            reason = summary.end_reason().as_str(),
            "session completed"
        );
        Ok(())
    }
}
