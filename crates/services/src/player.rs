//! Stateful course view: load phases, active module dispatch and the quiz
//! attempt of the active module.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use course_core::Clock;
use course_core::model::{Course, CourseId, Module, ModuleId, VideoRef};
use course_core::quiz::QuizError;
use course_core::sequencer::{
    ActiveContent, Advance, ModuleSequencer, OutlineEntry, SequencerError, SequencerProgress,
};
use storage::repository::CourseProgress;

use crate::assessment::{AssessmentEngine, AttemptState, GradeDelivery, PendingGrade};
use crate::error::{CourseLoadError, PlayerError};
use crate::grade_submitter::GradeSubmitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    Loading,
    Ready,
    Completed,
    Error,
}

/// Handle for one in-flight module fetch.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    course_id: CourseId,
    generation: u64,
    cancelled: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
}

impl LoadTicket {
    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancelled directly or through `CoursePlayer::abandon`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || !self.alive.load(Ordering::SeqCst)
    }
}

/// Everything a successful fetch hands to `apply_load`.
#[derive(Debug, Clone)]
pub struct LoadedCourse {
    pub course: Option<Course>,
    pub modules: Vec<Module>,
    /// Locally saved frontier, as a module number.
    pub saved_frontier: Option<i64>,
}

/// Active module, dispatched by type.
#[derive(Debug)]
pub enum ActiveView<'a> {
    Text(&'a str),
    Video(&'a VideoRef),
    Quiz(&'a AssessmentEngine),
    /// The quiz payload could not be parsed; the module cannot be displayed.
    QuizUnavailable(&'a QuizError),
}

/// A quiz grade leaving the player.
#[derive(Debug)]
pub struct QuizSubmission {
    pending: PendingGrade,
    course_id: CourseId,
    module_id: ModuleId,
    alive: Arc<AtomicBool>,
}

impl QuizSubmission {
    #[must_use]
    pub fn pending(&self) -> &PendingGrade {
        &self.pending
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub async fn deliver(self, submitter: &GradeSubmitter) -> QuizDelivery {
        let delivery = self.pending.deliver(submitter, &self.course_id).await;
        QuizDelivery {
            delivery,
            module_id: self.module_id,
            alive: self.alive,
        }
    }
}

/// Delivered grade on its way back into the player.
#[derive(Debug)]
pub struct QuizDelivery {
    delivery: GradeDelivery,
    module_id: ModuleId,
    alive: Arc<AtomicBool>,
}

impl QuizDelivery {
    #[must_use]
    pub fn delivery(&self) -> &GradeDelivery {
        &self.delivery
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }
}

pub struct CoursePlayer {
    course_id: CourseId,
    course: Option<Course>,
    phase: PlayerPhase,
    error: Option<CourseLoadError>,
    sequencer: Option<ModuleSequencer>,
    /// Frontier read from storage; may name a module that no longer exists.
    saved_frontier: Option<i64>,
    quiz: Option<Result<AssessmentEngine, QuizError>>,
    generation: u64,
    alive: Arc<AtomicBool>,
    clock: Clock,
}

impl CoursePlayer {
    #[must_use]
    pub fn new(course_id: CourseId, clock: Clock) -> Self {
        Self {
            course_id,
            course: None,
            phase: PlayerPhase::Loading,
            error: None,
            sequencer: None,
            saved_frontier: None,
            quiz: None,
            generation: 0,
            alive: Arc::new(AtomicBool::new(true)),
            clock,
        }
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    #[must_use]
    pub fn error(&self) -> Option<&CourseLoadError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn sequencer(&self) -> Option<&ModuleSequencer> {
        self.sequencer.as_ref()
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Enters `Loading` and supersedes any earlier ticket.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.phase = PlayerPhase::Loading;
        self.error = None;
        LoadTicket {
            course_id: self.course_id.clone(),
            generation: self.generation,
            cancelled: Arc::new(AtomicBool::new(false)),
            alive: Arc::clone(&self.alive),
        }
    }

    /// Applies a fetch result. Returns false, changing nothing, for a stale
    /// or cancelled ticket.
    pub fn apply_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<LoadedCourse, CourseLoadError>,
    ) -> bool {
        if ticket.generation != self.generation || ticket.is_cancelled() {
            debug!(course_id = %self.course_id, "dropping stale course load");
            return false;
        }

        let loaded = result.and_then(|loaded| {
            let mut sequencer = ModuleSequencer::new(loaded.modules)
                .map_err(|_: SequencerError| CourseLoadError::EmptyCourse)?;
            if let Some(num) = loaded.saved_frontier {
                sequencer.restore_frontier(num);
            }
            Ok((loaded.course, sequencer, loaded.saved_frontier))
        });

        match loaded {
            Ok((course, sequencer, saved_frontier)) => {
                self.course = course;
                self.sequencer = Some(sequencer);
                self.saved_frontier = saved_frontier;
                self.phase = PlayerPhase::Ready;
                self.enter_active();
            }
            Err(err) => {
                warn!(course_id = %self.course_id, error = %err, "course failed to load");
                self.sequencer = None;
                self.saved_frontier = None;
                self.quiz = None;
                self.error = Some(err);
                self.phase = PlayerPhase::Error;
            }
        }
        true
    }

    /// Cancels every outstanding load and quiz submission.
    pub fn abandon(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        self.alive = Arc::new(AtomicBool::new(true));
        self.generation += 1;
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Jumps to a reached module. Leaving a quiz module discards its attempt.
    pub fn go_to(&mut self, index: usize) -> bool {
        if !self.is_navigable() {
            return false;
        }
        let Some(sequencer) = self.sequencer.as_mut() else {
            return false;
        };
        let before = sequencer.current_index();
        if !sequencer.go_to(index) {
            return false;
        }
        self.phase = PlayerPhase::Ready;
        if index != before {
            self.enter_active();
        }
        true
    }

    /// Moves forward one module, or completes the course from the last one.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotReady` before a successful load.
    pub fn advance(&mut self) -> Result<Advance, PlayerError> {
        if !self.is_navigable() {
            return Err(PlayerError::NotReady);
        }
        let sequencer = self.sequencer.as_mut().ok_or(PlayerError::NotReady)?;
        let outcome = sequencer.advance();
        match outcome {
            Advance::Moved(_) => {
                self.phase = PlayerPhase::Ready;
                self.enter_active();
            }
            Advance::CourseCompleted => {
                debug!(course_id = %self.course_id, "course completed");
                self.phase = PlayerPhase::Completed;
            }
        }
        Ok(outcome)
    }

    /// Advances past a quiz whose attempt has completed.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NoQuiz` when the active module has no playable
    /// quiz and `PlayerError::QuizNotCompleted` before the attempt completes.
    pub fn continue_after_quiz(&mut self) -> Result<Advance, PlayerError> {
        let state = match &self.quiz {
            Some(Ok(engine)) => engine.state(),
            Some(Err(_)) | None => return Err(PlayerError::NoQuiz),
        };
        if state != AttemptState::Completed {
            return Err(PlayerError::QuizNotCompleted);
        }
        self.advance()
    }

    #[must_use]
    pub fn active(&self) -> Option<ActiveView<'_>> {
        if !self.is_navigable() {
            return None;
        }
        let view = match self.sequencer.as_ref()?.active() {
            ActiveContent::Text(body) => ActiveView::Text(body),
            ActiveContent::Video(video) => ActiveView::Video(video),
            ActiveContent::Test(_) => match self.quiz.as_ref()? {
                Ok(engine) => ActiveView::Quiz(engine),
                Err(err) => ActiveView::QuizUnavailable(err),
            },
        };
        Some(view)
    }

    #[must_use]
    pub fn active_module(&self) -> Option<&Module> {
        self.sequencer.as_ref().map(ModuleSequencer::active_module)
    }

    /// Engine of the active quiz module, for answering questions.
    pub fn quiz_mut(&mut self) -> Option<&mut AssessmentEngine> {
        self.quiz.as_mut().and_then(|quiz| quiz.as_mut().ok())
    }

    //
    // ─── QUIZ SUBMISSION ───────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `PlayerError::NoQuiz` without a playable quiz and
    /// `PlayerError::Assessment` when the attempt cannot be submitted.
    pub fn begin_quiz_submit(&mut self) -> Result<QuizSubmission, PlayerError> {
        let module_id = self
            .active_module()
            .map(|module| module.id().clone())
            .ok_or(PlayerError::NotReady)?;
        let engine = self.quiz_mut().ok_or(PlayerError::NoQuiz)?;
        let pending = engine.begin_submit()?;
        Ok(QuizSubmission {
            pending,
            course_id: self.course_id.clone(),
            module_id,
            alive: Arc::clone(&self.alive),
        })
    }

    /// Hands a delivered grade to the active quiz. Returns false when the
    /// player was abandoned or the quiz is no longer active.
    pub fn finish_quiz_submit(&mut self, delivery: QuizDelivery) -> bool {
        if !delivery.alive.load(Ordering::SeqCst) {
            debug!(module_id = %delivery.module_id, "dropping grade for abandoned player");
            return false;
        }
        let still_active = self
            .active_module()
            .is_some_and(|module| module.id() == &delivery.module_id);
        if !still_active {
            debug!(module_id = %delivery.module_id, "dropping grade for inactive quiz");
            return false;
        }
        self.quiz_mut()
            .is_some_and(|engine| engine.finish_submit(delivery.delivery))
    }

    //
    // ─── SUMMARY ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn outline(&self) -> Vec<OutlineEntry> {
        self.sequencer
            .as_ref()
            .map(ModuleSequencer::outline)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn progress(&self) -> Option<SequencerProgress> {
        self.sequencer.as_ref().map(ModuleSequencer::progress)
    }

    /// Frontier to persist, taken at the player's clock.
    ///
    /// Never below the number loaded from storage, so a saved frontier
    /// between two current module numbers is kept as is.
    #[must_use]
    pub fn progress_snapshot(&self) -> Option<CourseProgress> {
        self.sequencer.as_ref().map(|sequencer| {
            let reached = sequencer.frontier_module_num();
            let frontier = self.saved_frontier.map_or(reached, |saved| saved.max(reached));
            CourseProgress {
                course_id: self.course_id.clone(),
                frontier_module_num: frontier,
                updated_at: self.clock.now(),
            }
        })
    }

    fn is_navigable(&self) -> bool {
        matches!(self.phase, PlayerPhase::Ready | PlayerPhase::Completed)
    }

    fn enter_active(&mut self) {
        let Some(sequencer) = self.sequencer.as_ref() else {
            self.quiz = None;
            return;
        };
        self.quiz = match sequencer.active() {
            ActiveContent::Test(payload) => {
                let engine = AssessmentEngine::from_payload(payload, self.clock);
                if let Err(err) = &engine {
                    warn!(
                        module_id = %sequencer.active_module().id(),
                        error = %err,
                        "quiz payload cannot be displayed"
                    );
                }
                Some(engine)
            }
            ActiveContent::Text(_) | ActiveContent::Video(_) => None,
        };
    }
}
