use std::sync::Arc;

use tracing::{debug, info, warn};

use course_core::Clock;
use course_core::model::{CourseId, ModuleId, QuizScore};
use course_core::sequencer::Advance;
use storage::repository::{
    ProgressRepository, QuizResultRecord, QuizResultRepository, Storage, StorageError,
};

use crate::api::ModuleProvider;
use crate::authorized::AuthorizedClient;
use crate::error::{CourseLoadError, PlayerError};
use crate::grade_submitter::GradeSubmitter;
use crate::player::{CoursePlayer, LoadTicket, LoadedCourse};

/// Loads courses into players and persists what the learner did locally.
#[derive(Clone)]
pub struct CourseService {
    client: AuthorizedClient,
    modules: Arc<dyn ModuleProvider>,
    grades: GradeSubmitter,
    progress: Arc<dyn ProgressRepository>,
    quiz_results: Arc<dyn QuizResultRepository>,
    clock: Clock,
}

impl CourseService {
    #[must_use]
    pub fn new(
        client: AuthorizedClient,
        modules: Arc<dyn ModuleProvider>,
        grades: GradeSubmitter,
        storage: &Storage,
        clock: Clock,
    ) -> Self {
        Self {
            client,
            modules,
            grades,
            progress: Arc::clone(&storage.progress),
            quiz_results: Arc::clone(&storage.quiz_results),
            clock,
        }
    }

    #[must_use]
    pub fn grades(&self) -> &GradeSubmitter {
        &self.grades
    }

    /// Creates a player for a course; nothing is fetched yet.
    #[must_use]
    pub fn open(&self, course_id: CourseId) -> CoursePlayer {
        CoursePlayer::new(course_id, self.clock)
    }

    /// Fetches the modules of the ticket's course and its saved frontier.
    ///
    /// # Errors
    ///
    /// Returns `CourseLoadError` when the modules cannot be fetched or the
    /// session has ended. Failing to read saved progress is not an error.
    pub async fn fetch(&self, ticket: &LoadTicket) -> Result<LoadedCourse, CourseLoadError> {
        let course_id = ticket.course_id();
        let provider = self.modules.as_ref();
        let page = self
            .client
            .send(move |token| async move { provider.fetch_modules(&token, course_id).await })
            .await?;
        debug!(course_id = %course_id, modules = page.items.len(), "modules fetched");

        let saved_frontier = match self.progress.load_progress(course_id).await {
            Ok(saved) => saved.map(|p| p.frontier_module_num),
            Err(err) => {
                warn!(course_id = %course_id, error = %err, "saved progress unavailable");
                None
            }
        };

        Ok(LoadedCourse {
            course: page.course,
            modules: page.items,
            saved_frontier,
        })
    }

    /// Loads `player` from the backend. Returns whether the result was applied.
    pub async fn load(&self, player: &mut CoursePlayer) -> bool {
        let ticket = player.begin_load();
        let result = self.fetch(&ticket).await;
        player.apply_load(&ticket, result)
    }

    /// Stores the player's frontier; failures are logged and swallowed.
    pub async fn save_progress(&self, player: &CoursePlayer) {
        let Some(progress) = player.progress_snapshot() else {
            return;
        };
        if let Err(err) = self.progress.save_progress(&progress).await {
            warn!(course_id = %progress.course_id, error = %err, "failed to save progress");
        }
    }

    /// `CoursePlayer::advance` followed by saving progress.
    ///
    /// # Errors
    ///
    /// See `CoursePlayer::advance`.
    pub async fn advance(&self, player: &mut CoursePlayer) -> Result<Advance, PlayerError> {
        let outcome = player.advance()?;
        self.save_progress(player).await;
        Ok(outcome)
    }

    /// `CoursePlayer::continue_after_quiz` followed by saving progress.
    ///
    /// # Errors
    ///
    /// See `CoursePlayer::continue_after_quiz`.
    pub async fn continue_after_quiz(
        &self,
        player: &mut CoursePlayer,
    ) -> Result<Advance, PlayerError> {
        let outcome = player.continue_after_quiz()?;
        self.save_progress(player).await;
        Ok(outcome)
    }

    /// Submits the active quiz, completes it and records the result locally.
    ///
    /// The returned score does not depend on whether the grade reached the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if there is no quiz ready to submit.
    pub async fn submit_quiz(&self, player: &mut CoursePlayer) -> Result<QuizScore, PlayerError> {
        let submission = player.begin_quiz_submit()?;
        let delivered = submission.deliver(&self.grades).await;

        let module_id = delivered.module_id().clone();
        let attempt_id = delivered.delivery().attempt_id();
        let score = delivered.delivery().score();

        if player.finish_quiz_submit(delivered) {
            let record = QuizResultRecord::from_score(
                player.course_id().clone(),
                module_id,
                attempt_id,
                &score,
                self.clock.now(),
            );
            match self.quiz_results.append_result(&record).await {
                Ok(_) => info!(
                    course_id = %record.course_id,
                    percentage = score.percentage(),
                    "quiz result recorded"
                ),
                Err(err) => {
                    warn!(attempt_id = %attempt_id, error = %err, "failed to record quiz result");
                }
            }
        }
        Ok(score)
    }

    /// Most recent locally recorded result for a quiz module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    pub async fn last_result(
        &self,
        course_id: &CourseId,
        module_id: &ModuleId,
    ) -> Result<Option<QuizResultRecord>, StorageError> {
        self.quiz_results.latest_result(course_id, module_id).await
    }
}
