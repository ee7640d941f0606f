use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::debug;

use quiz_core::generator::GeneratorSet;
use quiz_core::model::{
    Attempt, EndReason, Level, Question, QuizSettings, SessionId, SessionState, SessionSummary,
};
use quiz_core::scoring::ScoringEngine;

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Consecutive correct answers that raise the level.
pub const LEVEL_UP_STREAK: u32 = 3;
/// Consecutive wrong answers that lower the level.
pub const LEVEL_DOWN_MISSES: u32 = 2;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    Up(Level),
    Down(Level),
}

/// Result of asking the session for its next step.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Question(Question),
    Completed(SessionSummary),
}

/// Result of answering the pending question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: i64,
    pub attempt: Attempt,
    pub state: SessionState,
    pub level_change: Option<LevelChange>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One adaptive quiz session.
///
/// Owns the progression state and is the only place it changes. Questions are
/// pulled with [`QuizSession::advance`] and answered with
/// [`QuizSession::submit_answer`]; once completed or cancelled every further
/// call fails and the state stays frozen.
pub struct QuizSession {
    id: SessionId,
    settings: QuizSettings,
    generators: GeneratorSet,
    scoring: ScoringEngine,
    state: SessionState,
    highest_level: Level,
    status: SessionStatus,
    pending: Option<Question>,
    presented_at: Option<DateTime<Utc>>,
    attempts: Vec<Attempt>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
    summary_persisted: bool,
}

impl QuizSession {
    /// Start a session at level 1.
    ///
    /// `started_at` should come from the services layer clock to keep time deterministic.
    #[must_use]
    pub fn start(id: SessionId, settings: QuizSettings, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            settings,
            generators: GeneratorSet::new(),
            scoring: ScoringEngine::new(),
            state: SessionState::default(),
            highest_level: Level::MIN,
            status: SessionStatus::Active,
            pending: None,
            presented_at: None,
            attempts: Vec::new(),
            started_at,
            completed_at: None,
            summary: None,
            summary_persisted: false,
        }
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Active => Ok(()),
            SessionStatus::Completed => Err(SessionError::Completed),
            SessionStatus::Cancelled => Err(SessionError::Cancelled),
        }
    }

    /// Next question, or the summary once every question has been answered.
    ///
    /// A question that is still unanswered is returned again. Completion is
    /// reported once; later calls fail with `SessionError::Completed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session is no longer active or a summary
    /// cannot be built.
    pub fn advance(
        &mut self,
        rng: &mut dyn RngCore,
        now: DateTime<Utc>,
    ) -> Result<Advance, SessionError> {
        self.ensure_active()?;

        if let Some(question) = &self.pending {
            return Ok(Advance::Question(question.clone()));
        }

        if self.state.question_index >= self.settings.questions_per_session() {
            let summary = self.finish(EndReason::Completed, now)?;
            return Ok(Advance::Completed(summary));
        }

        let level = self.state.current_level;
        let generator = self.generators.select(self.settings.mode(), level);
        let question = generator.generate(rng, self.id, level)?;

        self.state.question_index += 1;
        self.pending = Some(question.clone());
        self.presented_at = Some(now);
        debug!(
            session = %self.id,
            index = self.state.question_index,
            %level,
            mode = %generator.mode(),
            "question generated"
        );
        Ok(Advance::Question(question))
    }

    /// Grade the pending question and update streak, score and level.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoPendingQuestion` when nothing awaits an answer,
    /// `SessionError::InvalidSelection` for an index outside the options, or a
    /// status error if the session ended.
    pub fn submit_answer(
        &mut self,
        selected_index: usize,
        elapsed_ms: u64,
    ) -> Result<AnswerOutcome, SessionError> {
        self.ensure_active()?;
        let question = self.pending.as_ref().ok_or(SessionError::NoPendingQuestion)?;
        let attempt = Attempt::grade(question, selected_index, elapsed_ms)
            .map_err(|_| SessionError::InvalidSelection(selected_index))?;
        let correct_answer = question.correct_answer();
        self.pending = None;
        self.presented_at = None;

        let level_change = if attempt.correct {
            self.record_correct(elapsed_ms)
        } else {
            self.record_wrong()
        };
        self.attempts.push(attempt);

        Ok(AnswerOutcome {
            correct: attempt.correct,
            correct_answer,
            attempt,
            state: self.state,
            level_change,
        })
    }

    fn record_correct(&mut self, elapsed_ms: u64) -> Option<LevelChange> {
        let s = &mut self.state;
        s.correct_count += 1;
        s.current_streak += 1;
        s.max_streak = s.max_streak.max(s.current_streak);
        s.consecutive_wrong = 0;
        s.score = self.scoring.calculate_score(
            s.score,
            s.current_streak,
            true,
            elapsed_ms,
            self.settings.timer_enabled(),
        );

        if s.current_streak % LEVEL_UP_STREAK == 0 {
            s.current_level = s.current_level.next();
            self.highest_level = self.highest_level.max(s.current_level);
            return Some(LevelChange::Up(s.current_level));
        }
        None
    }

    fn record_wrong(&mut self) -> Option<LevelChange> {
        let s = &mut self.state;
        s.wrong_count += 1;
        s.current_streak = 0;
        s.consecutive_wrong += 1;

        if s.consecutive_wrong >= LEVEL_DOWN_MISSES && s.current_level > Level::MIN {
            s.current_level = s.current_level.prev();
            s.consecutive_wrong = 0;
            return Some(LevelChange::Down(s.current_level));
        }
        None
    }

    /// End the session because its time budget ran out.
    ///
    /// Any unanswered question is discarded.
    ///
    /// # Errors
    ///
    /// Returns a status error if the session already ended.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<SessionSummary, SessionError> {
        self.ensure_active()?;
        self.finish(EndReason::TimeExpired, now)
    }

    /// Leave the session without a summary.
    ///
    /// # Errors
    ///
    /// Returns a status error if the session already ended.
    pub fn abandon(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.status = SessionStatus::Cancelled;
        self.pending = None;
        self.presented_at = None;
        Ok(())
    }

    fn finish(
        &mut self,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        let summary = SessionSummary::from_state(
            &self.state,
            self.highest_level,
            self.settings.questions_per_session(),
            reason,
            self.started_at,
            now,
        )?;
        self.status = SessionStatus::Completed;
        self.pending = None;
        self.presented_at = None;
        self.completed_at = Some(now);
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    /// When the session-wide countdown runs out, if the timer is on.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.settings
            .timer_enabled()
            .then(|| self.started_at + Duration::seconds(i64::from(self.settings.timer_seconds())))
    }

    /// Time left before the deadline; `None` without a timer.
    #[must_use]
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.deadline()
            .map(|deadline| (deadline - now).to_std().unwrap_or_default())
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.settings.questions_per_session();
        let answered = self.state.answered();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.status == SessionStatus::Completed,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn highest_level(&self) -> Level {
        self.highest_level
    }

    #[must_use]
    pub fn pending_question(&self) -> Option<&Question> {
        self.pending.as_ref()
    }

    /// When the pending question was handed out.
    #[must_use]
    pub fn presented_at(&self) -> Option<DateTime<Utc>> {
        self.presented_at
    }

    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub(crate) fn summary_persisted(&self) -> bool {
        self.summary_persisted
    }

    pub(crate) fn mark_summary_persisted(&mut self) {
        self.summary_persisted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuizMode, QuizSettingsDraft};
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn settings(questions: u32, timer_seconds: u32) -> QuizSettings {
        QuizSettingsDraft {
            mode: QuizMode::SingleOp,
            questions_per_session: questions,
            timer_seconds,
            ..QuizSettingsDraft::default()
        }
        .validate()
        .unwrap()
    }

    fn next_question(session: &mut QuizSession, rng: &mut StdRng) -> Question {
        match session.advance(rng, fixed_now()).unwrap() {
            Advance::Question(q) => q,
            Advance::Completed(_) => panic!("session completed early"),
        }
    }

    fn answer(session: &mut QuizSession, rng: &mut StdRng, correct: bool) -> AnswerOutcome {
        let q = next_question(session, rng);
        let index = if correct {
            q.correct_index()
        } else {
            (q.correct_index() + 1) % 4
        };
        session.submit_answer(index, 1_000).unwrap()
    }

    #[test]
    fn three_correct_raise_the_level() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = QuizSession::start(SessionId::new(1), settings(10, 0), fixed_now());

        answer(&mut session, &mut rng, true);
        answer(&mut session, &mut rng, true);
        let third = answer(&mut session, &mut rng, true);

        assert_eq!(third.level_change, Some(LevelChange::Up(Level::new(2).unwrap())));
        assert_eq!(third.state.current_level.value(), 2);
        assert_eq!(third.state.max_streak, 3);
        // 10 + 10 + (10 + 2)
        assert_eq!(third.state.score, 32);
        assert_eq!(session.highest_level().value(), 2);
    }

    #[test]
    fn two_wrong_lower_the_level_and_reset_the_counter() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = QuizSession::start(SessionId::new(1), settings(10, 0), fixed_now());
        for _ in 0..3 {
            answer(&mut session, &mut rng, true);
        }
        assert_eq!(session.state().current_level.value(), 2);

        let first = answer(&mut session, &mut rng, false);
        assert_eq!(first.level_change, None);
        assert_eq!(first.state.consecutive_wrong, 1);
        assert_eq!(first.state.current_streak, 0);

        let second = answer(&mut session, &mut rng, false);
        assert_eq!(second.level_change, Some(LevelChange::Down(Level::MIN)));
        assert_eq!(second.state.current_level, Level::MIN);
        assert_eq!(second.state.consecutive_wrong, 0);
        assert_eq!(session.highest_level().value(), 2);
    }

    #[test]
    fn level_never_drops_below_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = QuizSession::start(SessionId::new(1), settings(10, 0), fixed_now());
        for _ in 0..4 {
            let outcome = answer(&mut session, &mut rng, false);
            assert_eq!(outcome.state.current_level, Level::MIN);
            assert_eq!(outcome.state.score, 0);
        }
        assert_eq!(session.state().consecutive_wrong, 4);
    }

    #[test]
    fn completes_exactly_once_with_accuracy() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut session = QuizSession::start(SessionId::new(9), settings(5, 0), fixed_now());
        for correct in [true, false, true, true, false] {
            answer(&mut session, &mut rng, correct);
        }

        let Advance::Completed(summary) = session.advance(&mut rng, fixed_now()).unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(summary.end_reason(), EndReason::Completed);
        assert_eq!(summary.total_questions(), 5);
        assert_eq!(summary.correct_count(), 3);
        assert!((summary.accuracy() - 60.0).abs() < f64::EPSILON);
        assert!(session.is_complete());

        assert!(matches!(
            session.advance(&mut rng, fixed_now()),
            Err(SessionError::Completed)
        ));
        assert!(matches!(
            session.submit_answer(0, 10),
            Err(SessionError::Completed)
        ));
    }

    #[test]
    fn pending_question_is_returned_until_answered() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = QuizSession::start(SessionId::new(1), settings(3, 0), fixed_now());
        let first = next_question(&mut session, &mut rng);
        let again = next_question(&mut session, &mut rng);
        assert_eq!(first, again);
        assert_eq!(session.state().question_index, 1);
    }

    #[test]
    fn answer_guard_rails() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut session = QuizSession::start(SessionId::new(1), settings(3, 0), fixed_now());
        assert!(matches!(
            session.submit_answer(0, 0),
            Err(SessionError::NoPendingQuestion)
        ));

        next_question(&mut session, &mut rng);
        assert!(matches!(
            session.submit_answer(4, 0),
            Err(SessionError::InvalidSelection(4))
        ));
        // an invalid selection keeps the question pending
        assert!(session.pending_question().is_some());
        session.submit_answer(0, 0).unwrap();
        assert!(matches!(
            session.submit_answer(0, 0),
            Err(SessionError::NoPendingQuestion)
        ));
    }

    #[test]
    fn expiry_freezes_state() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = QuizSession::start(SessionId::new(1), settings(10, 30), fixed_now());
        answer(&mut session, &mut rng, true);
        next_question(&mut session, &mut rng);

        let later = fixed_now() + Duration::seconds(30);
        assert!(session.is_expired(later));
        assert_eq!(session.remaining_time(later), Some(std::time::Duration::ZERO));

        let before = *session.state();
        let summary = session.expire(later).unwrap();
        assert_eq!(summary.end_reason(), EndReason::TimeExpired);
        assert_eq!(summary.correct_count(), 1);
        assert_eq!(*session.state(), before);
        assert!(session.pending_question().is_none());
        assert!(matches!(session.expire(later), Err(SessionError::Completed)));
    }

    #[test]
    fn abandon_cancels_without_summary() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut session = QuizSession::start(SessionId::new(1), settings(10, 0), fixed_now());
        next_question(&mut session, &mut rng);
        session.abandon().unwrap();

        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert!(session.summary().is_none());
        assert!(matches!(
            session.advance(&mut rng, fixed_now()),
            Err(SessionError::Cancelled)
        ));
        assert!(session.deadline().is_none());
    }

    #[test]
    fn timer_enables_time_bonus() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = QuizSession::start(SessionId::new(1), settings(5, 60), fixed_now());
        let outcome = answer(&mut session, &mut rng, true);
        // 1 s of a 10 s budget earns the top time bonus
        assert_eq!(outcome.state.score, 15);
    }

    #[test]
    fn mixed_mode_serves_level_one_with_single_op() {
        let mut rng = StdRng::seed_from_u64(10);
        let settings = QuizSettingsDraft::default().validate().unwrap();
        assert_eq!(settings.mode(), QuizMode::RandomMix);
        let mut session = QuizSession::start(SessionId::new(1), settings, fixed_now());
        let q = next_question(&mut session, &mut rng);
        assert_eq!(q.level(), Level::MIN);
        assert_eq!(q.expression().split_whitespace().count(), 3);
    }
}
