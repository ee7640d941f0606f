use std::sync::Arc;

use rand::RngCore;
use tracing::info;

use quiz_core::model::{DisplayName, UserId, UserProfile, UserStats};
use quiz_core::names::random_display_name;
use storage::repository::{NewUser, SessionRepository, StorageError, UserRepository};

use crate::Clock;
use crate::error::ProfileError;

/// Player profiles and their lifetime statistics.
#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
}

/// A profile with its stats, `None` before the first completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub stats: Option<UserStats>,
}

fn unknown(id: UserId) -> impl FnOnce(StorageError) -> ProfileError {
    move |err| match err {
        StorageError::NotFound => ProfileError::UnknownProfile(id),
        other => ProfileError::Storage(other),
    }
}

impl ProfileService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            sessions,
        }
    }

    /// # Errors
    ///
    /// Returns `ProfileError::User` for an invalid name, or storage errors.
    pub async fn create(&self, display_name: &str) -> Result<UserProfile, ProfileError> {
        let display_name = DisplayName::new(display_name)?;
        self.insert(display_name).await
    }

    /// Create a profile with a generated "Adjective Noun NNNN" name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Storage` if the profile cannot be stored.
    pub async fn create_random(&self, rng: &mut dyn RngCore) -> Result<UserProfile, ProfileError> {
        let display_name = random_display_name(rng);
        self.insert(display_name).await
    }

    async fn insert(&self, display_name: DisplayName) -> Result<UserProfile, ProfileError> {
        let profile = self
            .users
            .create_user(NewUser {
                display_name,
                created_at: self.clock.now(),
            })
            .await?;
        info!(user = %profile.id(), name = %profile.display_name(), "profile created");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProfileError::UnknownProfile` if no such profile exists.
    pub async fn get(&self, id: UserId) -> Result<UserProfile, ProfileError> {
        self.users.get_user(id).await.map_err(unknown(id))
    }

    /// # Errors
    ///
    /// Returns `ProfileError::Storage` on storage failures.
    pub async fn list(&self) -> Result<Vec<UserProfile>, ProfileError> {
        Ok(self.users.list_users().await?)
    }

    /// The requested profile, or else the oldest one, or else a freshly
    /// created profile with a random name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::UnknownProfile` if `requested` does not exist.
    pub async fn current(
        &self,
        requested: Option<UserId>,
        rng: &mut dyn RngCore,
    ) -> Result<UserProfile, ProfileError> {
        if let Some(id) = requested {
            return self.get(id).await;
        }
        let first = self.users.list_users().await?.into_iter().next();
        match first {
            Some(profile) => Ok(profile),
            None => self.create_random(rng).await,
        }
    }

    /// # Errors
    ///
    /// Returns `ProfileError::User` for an invalid name or
    /// `ProfileError::UnknownProfile` if no such profile exists.
    pub async fn rename(&self, id: UserId, display_name: &str) -> Result<UserProfile, ProfileError> {
        let display_name = DisplayName::new(display_name)?;
        self.users
            .rename_user(id, &display_name)
            .await
            .map_err(unknown(id))
    }

    /// Delete a profile and all of its history.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::UnknownProfile` if no such profile exists.
    pub async fn delete(&self, id: UserId) -> Result<(), ProfileError> {
        self.users.delete_user(id).await.map_err(unknown(id))?;
        info!(user = %id, "profile deleted");
        Ok(())
    }

    /// Stats over the player's completed sessions.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::UnknownProfile` if no such profile exists.
    pub async fn stats(&self, id: UserId) -> Result<Option<UserStats>, ProfileError> {
        self.get(id).await?;
        let sessions = self.sessions.list_sessions(Some(id), u32::MAX).await?;
        Ok(UserStats::from_summaries(
            sessions.iter().filter_map(|s| s.summary.as_ref()),
        ))
    }

    /// # Errors
    ///
    /// Returns `ProfileError::UnknownProfile` if no such profile exists.
    pub async fn overview(&self, id: UserId) -> Result<ProfileOverview, ProfileError> {
        let profile = self.get(id).await?;
        let stats = self.stats(id).await?;
        Ok(ProfileOverview { profile, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{EndReason, Level, QuizMode, SessionState, SessionSummary, UserError};
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::{InMemoryRepository, NewSession};

    fn service(repo: &InMemoryRepository) -> ProfileService {
        ProfileService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn play(repo: &InMemoryRepository, user: UserId, score: u32, correct: u32, complete: bool) {
        let id = repo
            .create_session(NewSession {
                user_id: Some(user),
                mode: QuizMode::RandomMix,
                total_questions: 5,
                timer_seconds: 0,
                started_at: fixed_now(),
            })
            .await
            .unwrap();
        if !complete {
            return;
        }
        let state = SessionState {
            question_index: 5,
            score,
            max_streak: correct,
            correct_count: correct,
            wrong_count: 5 - correct,
            ..SessionState::default()
        };
        let summary = SessionSummary::from_state(
            &state,
            Level::new(2).unwrap(),
            5,
            EndReason::Completed,
            fixed_now(),
            fixed_now() + Duration::minutes(1),
        )
        .unwrap();
        repo.complete_session(id, &summary).await.unwrap();
    }

    #[tokio::test]
    async fn current_creates_a_random_profile_once() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let mut rng = StdRng::seed_from_u64(3);

        let first = svc.current(None, &mut rng).await.unwrap();
        assert_eq!(first.id(), UserId::new(1));
        assert_eq!(first.display_name().as_str().split(' ').count(), 3);
        assert_eq!(first.created_at(), fixed_now());

        let again = svc.current(None, &mut rng).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn requested_profiles_must_exist() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let mut rng = StdRng::seed_from_u64(4);

        let err = svc.current(Some(UserId::new(8)), &mut rng).await.unwrap_err();
        assert!(matches!(err, ProfileError::UnknownProfile(id) if id == UserId::new(8)));

        let ada = svc.create("  Ada ").await.unwrap();
        assert_eq!(svc.current(Some(ada.id()), &mut rng).await.unwrap(), ada);
        assert!(svc.list().await.unwrap().iter().all(|p| p.id() == ada.id()));
    }

    #[tokio::test]
    async fn rename_validates_the_new_name() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let ada = svc.create("Ada").await.unwrap();

        let err = svc.rename(ada.id(), "   ").await.unwrap_err();
        assert!(matches!(err, ProfileError::User(UserError::EmptyDisplayName)));
        let renamed = svc.rename(ada.id(), "Countess").await.unwrap();
        assert_eq!(renamed.display_name().as_str(), "Countess");
        assert!(matches!(
            svc.rename(UserId::new(99), "Ghost").await,
            Err(ProfileError::UnknownProfile(_))
        ));
    }

    #[tokio::test]
    async fn stats_cover_completed_sessions_only() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let ada = svc.create("Ada").await.unwrap();
        let bob = svc.create("Bob").await.unwrap();

        assert_eq!(svc.stats(ada.id()).await.unwrap(), None);

        play(&repo, ada.id(), 60, 5, true).await;
        play(&repo, ada.id(), 31, 2, true).await;
        play(&repo, ada.id(), 0, 0, false).await;
        play(&repo, bob.id(), 500, 5, true).await;

        let stats = svc.stats(ada.id()).await.unwrap().unwrap();
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.best_score, 60);
        assert_eq!(stats.average_score, 45);
        assert!((stats.average_accuracy - 70.0).abs() < 1e-9);
        assert_eq!(stats.best_streak, 5);
        assert_eq!(stats.highest_level.value(), 2);

        let overview = svc.overview(bob.id()).await.unwrap();
        assert_eq!(overview.profile, bob);
        assert_eq!(overview.stats.map(|s| s.best_score), Some(500));
    }

    #[tokio::test]
    async fn deleting_a_profile_clears_its_stats() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);
        let ada = svc.create("Ada").await.unwrap();
        play(&repo, ada.id(), 40, 4, true).await;

        svc.delete(ada.id()).await.unwrap();
        assert!(matches!(
            svc.stats(ada.id()).await,
            Err(ProfileError::UnknownProfile(_))
        ));
        assert!(repo.top_sessions(10, None).await.unwrap().is_empty());
    }
}
