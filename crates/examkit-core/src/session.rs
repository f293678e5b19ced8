//! Timed exam session state machine.
//!
//! An [`ExamSession`] walks `Loading → Ready → Active → Submitting →
//! Submitted | Failed`. While `Active` a [`Countdown`] task ticks once per
//! period; reaching zero passes through `Expired` and submits whatever has
//! been answered. Every answer change is checkpointed to the store through a
//! per-session writer task so the attempt can be resumed after the process
//! dies.
//!
//! All mutable state sits behind one async mutex. The countdown task, the
//! presentation calls and submission serialize on it; nothing else writes it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ExamError, Result, StoreError};
use crate::model::{Exam, ExamResult, NewResult, Question, QuizProgress, User};
use crate::scoring::compute_score;
use crate::traits::ExamStore;

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown tick period in milliseconds. One tick removes one second.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// While answers exist, checkpoint every this many ticks. 0 disables.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every_secs: u32,
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_checkpoint_every() -> u32 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            checkpoint_every_secs: default_checkpoint_every(),
        }
    }
}

impl SessionConfig {
    fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Loading,
    /// Loading failed; `load()` may be called again.
    LoadFailed(String),
    Ready,
    Active,
    /// The countdown reached zero and an automatic submission is underway.
    Expired,
    Submitting,
    Submitted,
    /// Submission failed; `submit()` may be called again.
    Failed(String),
}

impl SessionState {
    /// `Submitted` or `Failed`: nothing more happens without user action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Submitted | SessionState::Failed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Loading => write!(f, "loading"),
            SessionState::LoadFailed(msg) => write!(f, "load failed ({msg})"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Active => write!(f, "active"),
            SessionState::Expired => write!(f, "expired"),
            SessionState::Submitting => write!(f, "submitting"),
            SessionState::Submitted => write!(f, "submitted"),
            SessionState::Failed(msg) => write!(f, "failed ({msg})"),
        }
    }
}

/// Point-in-time copy of what a presentation layer renders.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: SessionState,
    pub exam: Option<Exam>,
    pub cursor: usize,
    pub question_count: usize,
    pub current_question: Option<Question>,
    pub answers: BTreeMap<u32, u32>,
    pub time_left_secs: u32,
    pub result: Option<ExamResult>,
}

impl SessionView {
    /// The option chosen for the question under the cursor, if any.
    pub fn current_answer(&self) -> Option<u32> {
        self.answers.get(&(self.cursor as u32)).copied()
    }

    pub fn is_last_question(&self) -> bool {
        self.question_count > 0 && self.cursor + 1 == self.question_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitMode {
    /// User-initiated; every question must be answered before the deadline.
    Manual,
    /// Countdown reached zero; partial answers are accepted.
    Deadline,
}

#[derive(Default)]
struct Core {
    exam: Option<Exam>,
    questions: Vec<Question>,
    cursor: usize,
    answers: BTreeMap<u32, u32>,
    time_left: u32,
    expired: bool,
    ticks_since_checkpoint: u32,
    result: Option<ExamResult>,
    progress_cleared: bool,
}

impl Core {
    fn snapshot(&self, exam_id: i64, user_id: i64) -> QuizProgress {
        QuizProgress {
            exam_id,
            user_id,
            answers: self.answers.clone(),
            last_updated: Utc::now(),
            time_left_secs: self.time_left,
        }
    }

    fn is_complete(&self) -> bool {
        (0..self.questions.len()).all(|i| self.answers.contains_key(&(i as u32)))
    }
}

// ---------------------------------------------------------------------------
// Checkpoint writer
// ---------------------------------------------------------------------------

enum CheckpointMsg {
    Save(QuizProgress),
    Flush(oneshot::Sender<()>),
}

/// Serializes progress upserts for one session. Failures are logged only.
struct Checkpointer {
    tx: mpsc::UnboundedSender<CheckpointMsg>,
}

impl Checkpointer {
    fn spawn(store: Arc<dyn ExamStore>, span: tracing::Span) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(
            async move {
                while let Some(msg) = rx.recv().await {
                    match msg {
                        CheckpointMsg::Save(progress) => {
                            match store.upsert_progress(&progress).await {
                                Ok(()) => tracing::debug!(
                                    answers = progress.answers.len(),
                                    time_left = progress.time_left_secs,
                                    "progress checkpointed"
                                ),
                                Err(e) => tracing::warn!("progress checkpoint failed: {e}"),
                            }
                        }
                        CheckpointMsg::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            }
            .instrument(span),
        );
        Self { tx }
    }

    fn save(&self, progress: QuizProgress) {
        if self.tx.send(CheckpointMsg::Save(progress)).is_err() {
            tracing::warn!("checkpoint writer has stopped; progress not saved");
        }
    }

    /// Wait until every checkpoint queued so far has been applied.
    async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(CheckpointMsg::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Shared session state
// ---------------------------------------------------------------------------

struct Shared {
    id: Uuid,
    exam_id: i64,
    user: User,
    config: SessionConfig,
    store: Arc<dyn ExamStore>,
    core: Mutex<Core>,
    state_tx: watch::Sender<SessionState>,
    checkpoints: Checkpointer,
    span: tracing::Span,
}

impl Shared {
    fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    fn set_state(&self, state: SessionState) {
        tracing::debug!(%state, "session state changed");
        self.state_tx.send_replace(state);
    }

    /// One countdown tick. Returns `false` once the countdown should stop.
    async fn tick(&self) -> bool {
        let mut core = self.core.lock().await;
        if self.state() != SessionState::Active {
            return false;
        }

        core.time_left = core.time_left.saturating_sub(1);
        if core.time_left == 0 {
            self.expire(&mut core).await;
            return false;
        }

        let every = self.config.checkpoint_every_secs;
        if every > 0 && !core.answers.is_empty() {
            core.ticks_since_checkpoint += 1;
            if core.ticks_since_checkpoint >= every {
                core.ticks_since_checkpoint = 0;
                self.checkpoints.save(core.snapshot(self.exam_id, self.user.id));
            }
        }
        true
    }

    /// Enter `Expired` and submit whatever is answered.
    async fn expire(&self, core: &mut Core) {
        core.expired = true;
        self.set_state(SessionState::Expired);
        tracing::info!(
            answered = core.answers.len(),
            questions = core.questions.len(),
            "time expired, submitting automatically"
        );
        if let Err(e) = self.submit_locked(core, SubmitMode::Deadline).await {
            tracing::error!("automatic submission failed: {e}");
        }
    }

    async fn submit_locked(&self, core: &mut Core, mode: SubmitMode) -> Result<ExamResult> {
        let state = self.state();
        let allowed = match mode {
            SubmitMode::Manual => {
                matches!(state, SessionState::Active | SessionState::Failed(_))
            }
            SubmitMode::Deadline => state == SessionState::Expired,
        };
        if !allowed {
            return Err(ExamError::validation(format!(
                "cannot submit while session is {state}"
            )));
        }

        // Once the deadline has passed a retry is still a deadline submission.
        if mode == SubmitMode::Manual && !core.expired && !core.is_complete() {
            return Err(ExamError::validation(format!(
                "incomplete: {} of {} questions answered",
                core.answers.len(),
                core.questions.len()
            )));
        }

        let Some(exam) = core.exam.clone() else {
            return Err(ExamError::not_found(format!("exam {}", self.exam_id)));
        };

        self.set_state(SessionState::Submitting);

        match self.persist_result(core, &exam).await {
            Ok(result) => {
                self.set_state(SessionState::Submitted);
                tracing::info!(
                    result_id = result.id,
                    score = result.score,
                    total = result.total_questions,
                    time_spent = result.time_spent_secs,
                    "exam submitted"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!("submission failed: {e}");
                self.set_state(SessionState::Failed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Write the result (once) and clear the resume row.
    async fn persist_result(
        &self,
        core: &mut Core,
        exam: &Exam,
    ) -> std::result::Result<ExamResult, StoreError> {
        let result = match &core.result {
            Some(result) => result.clone(),
            None => {
                let answers: Vec<Option<u32>> = (0..core.questions.len())
                    .map(|i| core.answers.get(&(i as u32)).copied())
                    .collect();
                let correct_answers: Vec<u32> =
                    core.questions.iter().map(|q| q.correct_option).collect();

                let new_result = NewResult {
                    exam_id: exam.id,
                    student_id: self.user.id,
                    score: compute_score(&answers, &correct_answers),
                    answers,
                    correct_answers,
                    time_spent_secs: exam.duration_secs().saturating_sub(core.time_left),
                    exam_title: exam.title.clone(),
                    total_questions: core.questions.len() as u32,
                    submitted_at: Utc::now(),
                };
                let stored = self.store.insert_result(&new_result).await?;
                core.result = Some(stored.clone());
                stored
            }
        };

        // A queued checkpoint landing after the delete would resurrect the row.
        self.checkpoints.flush().await;
        self.store.delete_progress(self.exam_id, self.user.id).await?;
        core.progress_cleared = true;
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Cancellable periodic tick task owned by a session.
///
/// Dropping the handle cancels the task at its next tick boundary; `stop()`
/// additionally waits for an in-flight tick to finish.
struct Countdown {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    fn start(shared: Arc<Shared>) -> Self {
        let (cancel, mut cancelled) = oneshot::channel::<()>();
        let period = shared.config.tick();
        let span = shared.span.clone();

        let task = tokio::spawn(
            async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut cancelled => {
                            tracing::debug!("countdown cancelled");
                            break;
                        }
                        _ = interval.tick() => {
                            if !shared.tick().await {
                                tracing::debug!("countdown finished");
                                break;
                            }
                        }
                    }
                }
            }
            .instrument(span),
        );

        Self {
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    async fn stop(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("countdown task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Public session handle
// ---------------------------------------------------------------------------

/// One student's attempt at one exam.
///
/// Must be created inside a Tokio runtime: it spawns its checkpoint writer
/// immediately and its countdown on [`start`](Self::start).
pub struct ExamSession {
    shared: Arc<Shared>,
    countdown: Option<Countdown>,
}

impl ExamSession {
    /// Create a session in `Loading`. Call [`load`](Self::load) next.
    pub fn new(
        store: Arc<dyn ExamStore>,
        exam_id: i64,
        user: User,
        config: SessionConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let span = tracing::info_span!(
            "exam_session",
            session_id = %id,
            exam_id,
            user_id = user.id
        );
        let checkpoints = Checkpointer::spawn(Arc::clone(&store), span.clone());
        let (state_tx, _) = watch::channel(SessionState::Loading);

        Self {
            shared: Arc::new(Shared {
                id,
                exam_id,
                user,
                config,
                store,
                core: Mutex::new(Core::default()),
                state_tx,
                checkpoints,
                span,
            }),
            countdown: None,
        }
    }

    /// `new` followed by `load`.
    pub async fn open(
        store: Arc<dyn ExamStore>,
        exam_id: i64,
        user: User,
        config: SessionConfig,
    ) -> Result<Self> {
        let session = Self::new(store, exam_id, user, config);
        session.load().await?;
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Receive every state change, e.g. to notice an automatic submission.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    /// Wait until the session is `Submitted` or `Failed`.
    pub async fn wait_until_finished(&self) -> SessionState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(SessionState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Load the exam and restore any saved progress. Retry after `LoadFailed`.
    pub async fn load(&self) -> Result<()> {
        let shared = &self.shared;
        async move {
            let mut core = shared.core.lock().await;
            match shared.state() {
                SessionState::Loading | SessionState::LoadFailed(_) => {}
                state => {
                    return Err(ExamError::validation(format!(
                        "cannot load while session is {state}"
                    )))
                }
            }
            shared.set_state(SessionState::Loading);

            match Self::fetch(shared).await {
                Ok((exam, questions, progress)) => {
                    core.time_left = exam.duration_secs();
                    core.answers.clear();
                    if let Some(progress) = progress {
                        core.time_left = progress.time_left_secs;
                        core.answers = progress
                            .answers
                            .into_iter()
                            .filter(|(q, opt)| {
                                let valid = questions
                                    .get(*q as usize)
                                    .is_some_and(|question| question.has_option(*opt));
                                if !valid {
                                    tracing::warn!(
                                        question = q,
                                        option = opt,
                                        "dropping saved answer outside the exam"
                                    );
                                }
                                valid
                            })
                            .collect();
                        tracing::info!(
                            answered = core.answers.len(),
                            time_left = core.time_left,
                            "resuming saved progress"
                        );
                    }
                    tracing::info!(
                        title = %exam.title,
                        questions = questions.len(),
                        "exam loaded"
                    );
                    core.exam = Some(exam);
                    core.questions = questions;
                    core.cursor = 0;
                    shared.set_state(SessionState::Ready);
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!("exam load failed: {e}");
                    shared.set_state(SessionState::LoadFailed(e.to_string()));
                    Err(e)
                }
            }
        }
        .instrument(self.shared.span.clone())
        .await
    }

    async fn fetch(shared: &Shared) -> Result<(Exam, Vec<Question>, Option<QuizProgress>)> {
        let exam = shared
            .store
            .get_exam(shared.exam_id)
            .await?
            .ok_or_else(|| ExamError::not_found(format!("exam {}", shared.exam_id)))?;

        let questions = shared.store.get_questions(shared.exam_id).await?;
        if questions.is_empty() {
            return Err(ExamError::not_found(format!(
                "no questions for exam {}",
                shared.exam_id
            )));
        }

        let progress = shared
            .store
            .get_progress(shared.exam_id, shared.user.id)
            .await?;
        Ok((exam, questions, progress))
    }

    /// Begin the attempt and start the countdown.
    ///
    /// Restored progress with no time left expires (and submits) at once.
    pub async fn start(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        {
            let mut core = shared.core.lock().await;
            let state = shared.state();
            if state != SessionState::Ready {
                return Err(ExamError::validation(format!(
                    "cannot start while session is {state}"
                )));
            }
            shared.set_state(SessionState::Active);
            tracing::info!(parent: &shared.span, time_left = core.time_left, "exam started");

            if core.time_left == 0 {
                shared.expire(&mut core).instrument(shared.span.clone()).await;
                return Ok(());
            }
        }

        self.countdown = Some(Countdown::start(shared));
        Ok(())
    }

    /// Record `option` for `question`, replacing any earlier choice, and
    /// queue a checkpoint.
    pub async fn set_answer(&self, question: u32, option: u32) -> Result<()> {
        let mut core = self.shared.core.lock().await;
        let state = self.shared.state();
        if state != SessionState::Active {
            return Err(ExamError::validation(format!(
                "cannot answer while session is {state}"
            )));
        }

        let Some(q) = core.questions.get(question as usize) else {
            return Err(ExamError::validation(format!(
                "question {question} is out of range (0..{})",
                core.questions.len()
            )));
        };
        if !q.has_option(option) {
            return Err(ExamError::validation(format!(
                "option {option} is out of range for question {question} (0..{})",
                q.options.len()
            )));
        }

        core.answers.insert(question, option);
        core.ticks_since_checkpoint = 0;
        self.shared
            .checkpoints
            .save(core.snapshot(self.shared.exam_id, self.shared.user.id));
        Ok(())
    }

    /// Answer the question under the cursor.
    pub async fn answer_current(&self, option: u32) -> Result<()> {
        let cursor = self.shared.core.lock().await.cursor;
        self.set_answer(cursor as u32, option).await
    }

    /// Move to the previous question. A no-op on the first one.
    pub async fn previous(&self) -> Result<usize> {
        let mut core = self.shared.core.lock().await;
        self.ensure_navigable()?;
        core.cursor = core.cursor.saturating_sub(1);
        Ok(core.cursor)
    }

    /// Move to the next question. Rejected on the last one.
    pub async fn next(&self) -> Result<usize> {
        let mut core = self.shared.core.lock().await;
        self.ensure_navigable()?;
        if core.cursor + 1 >= core.questions.len() {
            return Err(ExamError::validation(
                "already at the last question; submit instead",
            ));
        }
        core.cursor += 1;
        Ok(core.cursor)
    }

    fn ensure_navigable(&self) -> Result<()> {
        match self.shared.state() {
            SessionState::Ready | SessionState::Active => Ok(()),
            state => Err(ExamError::validation(format!(
                "cannot navigate while session is {state}"
            ))),
        }
    }

    /// Submit the attempt. Every question must be answered.
    pub async fn submit(&self) -> Result<ExamResult> {
        let shared = &self.shared;
        async move {
            let mut core = shared.core.lock().await;
            shared.submit_locked(&mut core, SubmitMode::Manual).await
        }
        .instrument(self.shared.span.clone())
        .await
    }

    pub async fn view(&self) -> SessionView {
        let core = self.shared.core.lock().await;
        SessionView {
            session_id: self.shared.id,
            state: self.shared.state(),
            exam: core.exam.clone(),
            cursor: core.cursor,
            question_count: core.questions.len(),
            current_question: core.questions.get(core.cursor).cloned(),
            answers: core.answers.clone(),
            time_left_secs: core.time_left,
            result: core.result.clone(),
        }
    }

    pub async fn time_left(&self) -> u32 {
        self.shared.core.lock().await.time_left
    }

    /// Wait until every queued checkpoint has reached the store.
    pub async fn flush_checkpoints(&self) {
        self.shared.checkpoints.flush().await;
    }

    /// Tear the session down.
    ///
    /// Stops the countdown first. If a result was recorded but its resume
    /// row survived, deletes the row once more; otherwise writes a final
    /// checkpoint before returning.
    pub async fn close(mut self) {
        let shared = Arc::clone(&self.shared);
        let span = shared.span.clone();
        async move {
            if let Some(countdown) = self.countdown.take() {
                countdown.stop().await;
            }

            let mut core = shared.core.lock().await;
            shared.checkpoints.flush().await;

            // A committed result must never be resumed as a fresh attempt.
            if core.result.is_some() {
                if core.progress_cleared {
                    return;
                }
                match shared.store.delete_progress(shared.exam_id, shared.user.id).await {
                    Ok(()) => {
                        core.progress_cleared = true;
                        tracing::info!("cleared resume row of submitted attempt");
                    }
                    Err(e) => tracing::error!("resume row of submitted attempt not cleared: {e}"),
                }
                return;
            }

            if core.exam.is_none() || core.progress_cleared || core.answers.is_empty() {
                tracing::debug!("session closed without final checkpoint");
                return;
            }
            match shared
                .store
                .upsert_progress(&core.snapshot(shared.exam_id, shared.user.id))
                .await
            {
                Ok(()) => tracing::info!(
                    answered = core.answers.len(),
                    time_left = core.time_left,
                    "final checkpoint written"
                ),
                Err(e) => tracing::warn!("final checkpoint failed: {e}"),
            }
        }
        .instrument(span)
        .await
    }
}
