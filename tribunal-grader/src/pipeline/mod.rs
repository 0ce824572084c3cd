//! Pipeline driver
//!
//! Sole writer of lifecycle transitions, progress events, and the result
//! cache. Runs one submission at a time (single-flight per id) under two
//! budgets: transcription and the end-to-end agent pipeline. The four phase
//! evaluators execute concurrently, but their start events are emitted in
//! the fixed phase order so the stream reads predictably.

pub mod scratch;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sqlx::SqlitePool;
use tribunal_common::config::Config;
use tribunal_common::contract::SubmissionResult;
use tribunal_common::{Phase, StreamStatus, PHASE_ORDER};
use uuid::Uuid;

use crate::agents::phase::{PhaseEvaluator, PhaseInput};
use crate::agents::{assembler, guard, plan_outline, rubric_radar};
use crate::db;
use crate::error::PipelineError;
use crate::models::{PhaseArtifact, Problem, Submission, SubmissionStatus, TranscriptRow};
use crate::providers::{LanguageModel, SpeechToText};
use crate::storage::ArtifactStore;
use crate::transcription;
use scratch::ScratchSession;

/// Progress checkpoints emitted per phase, indexed by `PHASE_ORDER`
const PHASE_PROGRESS: [f64; 4] = [0.3, 0.4, 0.5, 0.6];

fn phase_message(phase: Phase) -> &'static str {
    match phase {
        Phase::Clarify => "Evaluating how you scoped and clarified the problem...",
        Phase::Estimate => "Evaluating your capacity estimation...",
        Phase::Design => "Evaluating your system architecture...",
        Phase::Explain => "Evaluating your tradeoff reasoning...",
    }
}

/// Drives submissions through transcription, the evaluator panel,
/// synthesis, assembly, and the contract guard.
pub struct GradingDriver {
    db: SqlitePool,
    config: Arc<Config>,
    llm: Arc<dyn LanguageModel>,
    stt: Arc<dyn SpeechToText>,
    storage: ArtifactStore,
    /// Active runs; presence means a driver task owns that submission
    active: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl GradingDriver {
    pub fn new(
        db: SqlitePool,
        config: Arc<Config>,
        llm: Arc<dyn LanguageModel>,
        stt: Arc<dyn SpeechToText>,
        storage: ArtifactStore,
    ) -> Self {
        Self {
            db,
            config,
            llm,
            stt,
            storage,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Request cooperative cancellation of a running grade; no-op otherwise
    pub fn cancel(&self, submission_id: Uuid) {
        let active = self.active.lock().expect("active runs lock poisoned");
        if let Some(token) = active.get(&submission_id) {
            info!(submission_id = %submission_id, "Cancellation requested");
            token.cancel();
        }
    }

    /// Grade a submission end to end.
    ///
    /// Idempotent: a terminal submission is a no-op, and a second concurrent
    /// call for the same id is rejected by the single-flight guard.
    pub async fn run(&self, submission_id: Uuid) {
        let submission = match db::submissions::get_submission(&self.db, submission_id).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                warn!(submission_id = %submission_id, "Submission not found; nothing to grade");
                return;
            }
            Err(e) => {
                error!(submission_id = %submission_id, error = %e, "Failed to load submission");
                return;
            }
        };

        if submission.status.is_terminal() {
            info!(
                submission_id = %submission_id,
                status = %submission.status,
                "Submission already terminal; skipping"
            );
            return;
        }

        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock().expect("active runs lock poisoned");
            if active.contains_key(&submission_id) {
                warn!(submission_id = %submission_id, "Grading already in flight; rejecting");
                return;
            }
            active.insert(submission_id, cancel.clone());
        }
        // Removes the single-flight entry on every exit path
        let _guard = RunGuard {
            active: &self.active,
            submission_id,
        };

        match db::submissions::set_status(&self.db, submission_id, SubmissionStatus::Processing)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(submission_id = %submission_id, "Submission reached terminal state concurrently");
                return;
            }
            Err(e) => {
                error!(submission_id = %submission_id, error = %e, "Status transition failed");
                return;
            }
        }

        match self.execute(&submission, &cancel).await {
            Ok(result) => {
                info!(
                    submission_id = %submission_id,
                    overall = result.overall_score,
                    verdict = %result.verdict,
                    "Grading complete"
                );
            }
            Err(e) => {
                error!(submission_id = %submission_id, error = %e, "Grading failed");
                self.finish_failed(submission_id, &e).await;
            }
        }
    }

    /// The run body: everything between `processing` and the terminal event
    async fn execute(
        &self,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult, PipelineError> {
        let id = submission.id;
        let mut scratch = ScratchSession::new(id);

        self.emit(id, StreamStatus::Processing, "Submission accepted; grading started.", None, Some(0.0))
            .await?;

        let problem = db::problems::get_problem(&self.db, &submission.problem_id)
            .await
            .map_err(PipelineError::Persistence)?
            .ok_or_else(|| {
                PipelineError::Persistence(anyhow::anyhow!(
                    "problem '{}' missing for submission",
                    submission.problem_id
                ))
            })?;

        let artifacts = db::artifacts::get_artifacts(&self.db, id)
            .await
            .map_err(PipelineError::Persistence)?;
        for phase in PHASE_ORDER {
            if !artifacts.contains_key(&phase) {
                return Err(PipelineError::Persistence(anyhow::anyhow!(
                    "submission is missing artifacts for phase '{phase}'"
                )));
            }
        }

        // Transcription under its own budget
        self.emit(id, StreamStatus::Processing, "Transcribing phase audio...", None, Some(0.1))
            .await?;

        let snippets = cancellable(cancel, async {
            match timeout(
                self.config.transcription_timeout,
                transcription::transcribe_phases(Arc::clone(&self.stt), &self.storage, &artifacts),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(PipelineError::TranscriptionTimeout),
            }
        })
        .await?;

        let rows: Vec<TranscriptRow> = snippets
            .iter()
            .flat_map(|(phase, list)| {
                list.iter().map(|s| TranscriptRow {
                    phase: *phase,
                    timestamp_sec: s.timestamp_sec,
                    text: s.text.clone(),
                    is_highlight: false,
                })
            })
            .collect();
        db::transcripts::replace_transcripts(&self.db, id, &rows)
            .await
            .map_err(PipelineError::Persistence)?;

        self.emit(
            id,
            StreamStatus::Processing,
            "Transcription complete; the evaluation panel convenes.",
            None,
            Some(0.2),
        )
        .await?;

        // Panel, synthesis, assembly, and guard share the pipeline budget
        let result = cancellable(cancel, async {
            match timeout(
                self.config.pipeline_timeout,
                self.run_agents(submission, &problem, &artifacts, &snippets, &mut scratch),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(PipelineError::PipelineTimeout),
            }
        })
        .await?;

        // Commit the result cache, then the terminal event. An audit-row or
        // event failure after the cache commit must not fail the run.
        let applied = db::submissions::complete_with_result(&self.db, id, &result)
            .await
            .map_err(PipelineError::Persistence)?;
        if !applied {
            return Err(PipelineError::Persistence(anyhow::anyhow!(
                "submission reached a terminal state before the result could be cached"
            )));
        }

        if let Err(e) = db::results::save_result(&self.db, id, &result).await {
            warn!(submission_id = %id, error = %e, "Audit result write failed after cache commit");
        }
        if let Err(e) = self
            .emit(
                id,
                StreamStatus::Complete,
                "The verdict is in. View your complete evaluation.",
                None,
                Some(1.0),
            )
            .await
        {
            warn!(submission_id = %id, error = %e, "Terminal event write failed after cache commit");
        }

        Ok(result)
    }

    /// Phase panel (concurrent) plus the synthesis chain
    async fn run_agents(
        &self,
        submission: &Submission,
        problem: &Problem,
        artifacts: &BTreeMap<Phase, PhaseArtifact>,
        snippets: &BTreeMap<Phase, Vec<tribunal_common::contract::TranscriptSnippet>>,
        scratch: &mut ScratchSession,
    ) -> Result<SubmissionResult, PipelineError> {
        let id = submission.id;

        let mut handles = Vec::with_capacity(4);
        for phase in PHASE_ORDER {
            let evaluator = PhaseEvaluator::new(phase);
            let llm = Arc::clone(&self.llm);
            let problem = problem.clone();
            let input = PhaseInput {
                snapshot_url: artifacts[&phase].canvas_url.clone(),
                transcripts: snippets.get(&phase).cloned().unwrap_or_default(),
                phase_time_secs: submission.phase_times.get(&phase).copied().unwrap_or(0),
            };
            handles.push(tokio::spawn(async move {
                evaluator.evaluate(llm.as_ref(), &problem, &input).await
            }));
        }

        // Evaluators run concurrently; events flush in fixed phase order by
        // emitting each phase's start just before awaiting its handle.
        for (i, (phase, handle)) in PHASE_ORDER.into_iter().zip(handles).enumerate() {
            self.emit(
                id,
                StreamStatus::from(phase),
                phase_message(phase),
                Some(phase),
                Some(PHASE_PROGRESS[i]),
            )
            .await?;

            let judgement = handle
                .await
                .map_err(|e| PipelineError::agent(phase.as_str(), anyhow::anyhow!(e)))??;
            scratch.set_judgement(judgement);
        }

        let judgements = scratch.judgement_array()?;
        let scores = scratch.phase_scores()?;

        self.emit(
            id,
            StreamStatus::Synthesizing,
            "The panel deliberates and drafts the final report...",
            None,
            Some(0.85),
        )
        .await?;

        let rr = rubric_radar::synthesize(
            self.llm.as_ref(),
            &problem.rubric_definition,
            &scores,
        )
        .await?;
        scratch.rubric_radar = Some(rr.clone());

        let po = plan_outline::generate(self.llm.as_ref(), problem, &judgements, &rr).await?;
        scratch.plan_outline = Some(po.clone());

        let mut result = assembler::assemble(
            submission,
            problem,
            &judgements,
            &rr,
            &po,
            chrono::Utc::now(),
        );

        let ctx = guard::GuardContext {
            judgements: &judgements,
            rubric_defs: &problem.rubric_definition,
        };
        guard::enforce(&mut result, &ctx)?;

        Ok(result)
    }

    /// Terminal failure path: transition, then the single `failed` event
    async fn finish_failed(&self, submission_id: Uuid, reason: &PipelineError) {
        match db::submissions::set_status(&self.db, submission_id, SubmissionStatus::Failed).await
        {
            Ok(true) => {
                let message = format!("Grading failed: {reason}");
                if let Err(e) = self
                    .emit(submission_id, StreamStatus::Failed, &message, None, None)
                    .await
                {
                    error!(
                        submission_id = %submission_id,
                        error = %e,
                        "Failed to persist terminal failed event"
                    );
                }
            }
            Ok(false) => {
                // Already terminal; the trace owns its terminal event
                warn!(submission_id = %submission_id, "Skipping failed event for terminal submission");
            }
            Err(e) => {
                error!(
                    submission_id = %submission_id,
                    error = %e,
                    "Failed to transition submission to failed"
                );
            }
        }
    }

    async fn emit(
        &self,
        submission_id: Uuid,
        status: StreamStatus,
        message: &str,
        phase: Option<Phase>,
        progress: Option<f64>,
    ) -> Result<(), PipelineError> {
        db::events::append_event(&self.db, submission_id, status, message, phase, progress)
            .await
            .map_err(PipelineError::Persistence)
    }
}

/// Removes the submission from the active-run map when the run exits
struct RunGuard<'a> {
    active: &'a Mutex<HashMap<Uuid, CancellationToken>>,
    submission_id: Uuid,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.submission_id);
        } else {
            warn!(submission_id = %self.submission_id, "Active-run cleanup failed: lock poisoned");
        }
    }
}

/// Race a stage against the run's cancellation token
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T, PipelineError>>,
) -> Result<T, PipelineError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = fut => result,
    }
}
