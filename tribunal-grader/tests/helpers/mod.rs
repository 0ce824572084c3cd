//! Shared test helpers: in-memory database harness and scripted providers
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tribunal_common::config::Config;
use tribunal_common::{Phase, PHASE_ORDER};
use uuid::Uuid;

use tribunal_grader::db;
use tribunal_grader::models::PhaseArtifact;
use tribunal_grader::pipeline::GradingDriver;
use tribunal_grader::providers::{LanguageModel, ProviderError, SpeechToText};
use tribunal_grader::storage::ArtifactStore;

/// In-memory database plus tempdir-backed artifact store
pub struct TestHarness {
    pub db: SqlitePool,
    pub storage: ArtifactStore,
    pub config: Arc<Config>,
    _upload_dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let upload_dir = TempDir::new().unwrap();
        let mut config = config;
        config.upload_dir = upload_dir.path().to_path_buf();

        let db = db::init_memory_pool().await.unwrap();
        db::problems::seed_builtin_problems(&db).await.unwrap();

        Self {
            db,
            storage: ArtifactStore::new(upload_dir.path()),
            config: Arc::new(config),
            _upload_dir: upload_dir,
        }
    }

    pub fn driver(
        &self,
        llm: Arc<dyn LanguageModel>,
        stt: Arc<dyn SpeechToText>,
    ) -> Arc<GradingDriver> {
        Arc::new(GradingDriver::new(
            self.db.clone(),
            self.config.clone(),
            llm,
            stt,
            self.storage.clone(),
        ))
    }

    /// Create a queued submission with four canvases and audio on the given
    /// phases, mirroring what intake persists
    pub async fn create_submission(&self, audio_phases: &[Phase]) -> Uuid {
        let id = Uuid::new_v4();
        let phase_times: BTreeMap<Phase, u64> = [
            (Phase::Clarify, 180),
            (Phase::Estimate, 240),
            (Phase::Design, 480),
            (Phase::Explain, 300),
        ]
        .into_iter()
        .collect();

        db::submissions::create_submission(&self.db, id, "url-shortener", &phase_times)
            .await
            .unwrap();

        for phase in PHASE_ORDER {
            let canvas_url = self
                .storage
                .store_canvas(id, phase, "image/png", b"fake png bytes")
                .await
                .unwrap();

            let (audio_url, audio_mime) = if audio_phases.contains(&phase) {
                let url = self
                    .storage
                    .store_audio(id, phase, "audio/webm", b"fake audio bytes")
                    .await
                    .unwrap();
                (Some(url), Some("audio/webm".to_string()))
            } else {
                (None, None)
            };

            db::artifacts::insert_artifact(
                &self.db,
                id,
                &PhaseArtifact {
                    phase,
                    canvas_url,
                    canvas_mime: "image/png".into(),
                    audio_url,
                    audio_mime,
                },
            )
            .await
            .unwrap();
        }

        db::events::append_event(
            &self.db,
            id,
            tribunal_common::StreamStatus::Queued,
            "Submission received; queued for grading.",
            None,
            None,
        )
        .await
        .unwrap();

        id
    }
}

/// Scripted model that answers every pipeline stage with valid output.
/// `malformed_stage` makes that one phase evaluator return garbage.
pub struct ScriptedModel {
    pub scores: BTreeMap<Phase, f64>,
    pub malformed_stage: Option<Phase>,
}

impl ScriptedModel {
    pub fn with_scores(scores: [f64; 4]) -> Self {
        Self {
            scores: PHASE_ORDER.iter().copied().zip(scores).collect(),
            malformed_stage: None,
        }
    }

    pub fn malformed_on(phase: Phase) -> Self {
        let mut model = Self::with_scores([7.0; 4]);
        model.malformed_stage = Some(phase);
        model
    }

    fn judgement_json(&self, phase: Phase, cited_transcripts: serde_json::Value) -> String {
        let score = self.scores[&phase];
        json!({
            "phase": phase,
            "score": score,
            "bullets": [
                format!("Covered the essentials of the {phase} phase"),
                "Cited concrete numbers from the prompt",
                "Left one notable gap unaddressed"
            ],
            "evidence": {
                "phase": phase,
                "snapshot_url": format!("/uploads/test/canvas_{phase}.png"),
                "transcripts": cited_transcripts,
                "noticed": {
                    "strength": "Clear reasoning at the key decision point",
                    "issue": "One relevant consideration went unexplored"
                }
            },
            "strengths": [
                {"phase": phase, "text": format!("Strong moment in {phase}"), "timestamp_sec": 12.0}
            ],
            "weaknesses": [
                {"phase": phase, "text": format!("Gap found in {phase}"), "timestamp_sec": null}
            ],
            "highlights": []
        })
        .to_string()
    }

    fn plan_json() -> String {
        json!({
            "next_attempt_plan": [
                {"what_went_wrong": "Caching strategy was never discussed.",
                 "do_next_time": ["Identify read-heavy paths early", "Propose a concrete cache layer"]},
                {"what_went_wrong": "Server sizing was a magic number.",
                 "do_next_time": ["Derive instance counts from per-node throughput", "State utilization targets"]},
                {"what_went_wrong": "API surface stayed implicit.",
                 "do_next_time": ["Write out endpoints with verbs and payloads", "Cover error responses"]}
            ],
            "follow_up_questions": [
                "How would you invalidate cached redirects on URL deletion?",
                "What happens when the code generator collides?",
                "How would you shard the mapping table past one node?"
            ],
            "reference_outline": {
                "sections": [
                    {"section": "Requirements", "bullets": ["Shorten", "Redirect", "Analytics"]},
                    {"section": "Capacity", "bullets": ["4k QPS", "50GB storage", "100:1 reads"]},
                    {"section": "Design", "bullets": ["LB", "API tier", "KV store", "Cache"]},
                    {"section": "Tradeoffs", "bullets": ["Counter vs hash", "SQL vs NoSQL", "TTL policy"]}
                ]
            }
        })
        .to_string()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_json(&self, prompt: &str) -> Result<String, ProviderError> {
        for phase in PHASE_ORDER {
            if prompt.contains(&format!("Grade ONLY the '{phase}' phase")) {
                if self.malformed_stage == Some(phase) {
                    return Ok("I am not JSON, sorry about that".to_string());
                }
                // Cite a snippet only when the prompt actually carried some,
                // the way a faithful evaluator would
                let cited = if prompt.contains("Transcript snippets") {
                    json!([{"timestamp_sec": 0.0, "text": "We need ten million URLs per month."}])
                } else {
                    json!([])
                };
                return Ok(self.judgement_json(phase, cited));
            }
        }
        if prompt.contains("summarizing a system-design interview evaluation") {
            return Ok(
                json!({"summary": "Strong architecture work carried the interview; estimation was the weakest area. The verdict follows directly from the phase scores."})
                    .to_string(),
            );
        }
        if prompt.contains("generating improvement guidance") {
            return Ok(Self::plan_json());
        }
        Err(ProviderError::Api(400, format!(
            "unscripted prompt: {}",
            &prompt[..prompt.len().min(80)]
        )))
    }
}

/// Speech-to-text stub returning a fixed transcript
pub struct ScriptedStt;

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ProviderError> {
        Ok("We need ten million URLs per month. That works out to about four \
            thousand redirects per second on average."
            .to_string())
    }
}

/// Model that never answers within any reasonable budget
pub struct StallingModel;

#[async_trait]
impl LanguageModel for StallingModel {
    async fn generate_json(&self, _prompt: &str) -> Result<String, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Network("stalled".into()))
    }
}

/// Speech-to-text that never answers
pub struct StallingStt;

#[async_trait]
impl SpeechToText for StallingStt {
    async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Network("stalled".into()))
    }
}
