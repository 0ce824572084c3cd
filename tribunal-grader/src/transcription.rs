//! Transcription stage
//!
//! Fans the submission's audio blobs (at most one per phase) out to the
//! speech-to-text provider concurrently. Phases without audio yield an
//! empty snippet list. Default policy is all-or-fail: one provider error
//! fails the stage, tagged with the phase that failed.
//!
//! Providers return plain text without word-level timestamps, so snippets
//! are cut from fixed-length chunks and timestamped at chunk starts.

use anyhow::anyhow;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tribunal_common::contract::TranscriptSnippet;
use tribunal_common::{Phase, PHASE_ORDER};

use crate::error::PipelineError;
use crate::models::PhaseArtifact;
use crate::providers::SpeechToText;
use crate::storage::ArtifactStore;

/// Seconds of speech assigned to one snippet chunk
pub const CHUNK_SECONDS: f64 = 12.0;

/// Approximate spoken words per chunk at conversational pace
const WORDS_PER_CHUNK: usize = 30;

/// How the stage reacts to a provider error on one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// One error fails the whole stage (the default)
    #[default]
    AllOrFail,
    /// Errors degrade that phase to an empty transcript
    BestEffort,
}

/// Transcribe every phase with audio, concurrently.
///
/// Returns a map with an entry for all four phases; silent phases map to
/// empty lists.
pub async fn transcribe_phases(
    stt: Arc<dyn SpeechToText>,
    storage: &ArtifactStore,
    artifacts: &BTreeMap<Phase, PhaseArtifact>,
) -> Result<BTreeMap<Phase, Vec<TranscriptSnippet>>, PipelineError> {
    transcribe_phases_with_policy(stt, storage, artifacts, FailurePolicy::AllOrFail).await
}

/// Transcription fan-out with an explicit failure policy
pub async fn transcribe_phases_with_policy(
    stt: Arc<dyn SpeechToText>,
    storage: &ArtifactStore,
    artifacts: &BTreeMap<Phase, PhaseArtifact>,
    policy: FailurePolicy,
) -> Result<BTreeMap<Phase, Vec<TranscriptSnippet>>, PipelineError> {
    let tasks = PHASE_ORDER.map(|phase| {
        let stt = Arc::clone(&stt);
        let audio = artifacts
            .get(&phase)
            .and_then(|a| a.audio_url.clone().zip(a.audio_mime.clone()));
        let storage = storage.clone();

        async move {
            let Some((url, mime)) = audio else {
                return (phase, Ok(Vec::new()));
            };

            let result = async {
                let bytes = storage
                    .read_url(&url)
                    .await
                    .map_err(|e| anyhow!("read audio for {phase}: {e}"))?;
                let text = stt
                    .transcribe(&bytes, &mime)
                    .await
                    .map_err(|e| anyhow!("transcribe {phase}: {e}"))?;
                Ok(chunk_transcript(&text))
            }
            .await;

            (phase, result)
        }
    });

    let mut snippets = BTreeMap::new();
    for (phase, result) in join_all(tasks).await {
        match result {
            Ok(list) => {
                snippets.insert(phase, list);
            }
            Err(source) => match policy {
                FailurePolicy::AllOrFail => {
                    return Err(PipelineError::TranscriptionFailed { phase, source });
                }
                FailurePolicy::BestEffort => {
                    tracing::warn!(
                        phase = %phase,
                        error = %source,
                        "Transcription degraded to silence for phase"
                    );
                    snippets.insert(phase, Vec::new());
                }
            },
        }
    }

    Ok(snippets)
}

/// Split a plain-text transcript into timestamped snippets.
///
/// Sentences are packed into chunks of roughly `WORDS_PER_CHUNK` words;
/// each chunk starts `CHUNK_SECONDS` after the previous one, so timestamps
/// are non-decreasing by construction.
pub fn chunk_transcript(text: &str) -> Vec<TranscriptSnippet> {
    let mut snippets = Vec::new();
    let mut current = String::new();
    let mut word_count = 0usize;

    for sentence in split_sentences(text) {
        let words = sentence.split_whitespace().count();
        if word_count > 0 && word_count + words > WORDS_PER_CHUNK {
            push_chunk(&mut snippets, &mut current, &mut word_count);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
        word_count += words;
    }
    push_chunk(&mut snippets, &mut current, &mut word_count);

    snippets
}

fn push_chunk(snippets: &mut Vec<TranscriptSnippet>, current: &mut String, words: &mut usize) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        snippets.push(TranscriptSnippet {
            timestamp_sec: snippets.len() as f64 * CHUNK_SECONDS,
            text: trimmed.to_string(),
        });
    }
    current.clear();
    *words = 0;
}

/// Sentence boundaries on terminal punctuation; keeps the punctuation
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();

    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'?' | b'!') {
            let end = i + 1;
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::providers::ProviderError;

    struct FixedStt(&'static str);

    #[async_trait]
    impl SpeechToText for FixedStt {
        async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingStt;

    #[async_trait]
    impl SpeechToText for FailingStt {
        async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Network("connection reset".into()))
        }
    }

    fn artifact(phase: Phase, audio_url: Option<String>) -> PhaseArtifact {
        PhaseArtifact {
            phase,
            canvas_url: format!("/uploads/x/canvas_{phase}.png"),
            canvas_mime: "image/png".into(),
            audio_mime: audio_url.as_ref().map(|_| "audio/webm".to_string()),
            audio_url,
        }
    }

    #[test]
    fn chunk_timestamps_are_non_decreasing() {
        let text = "First sentence here. Second sentence with a few more words in it. \
                    Third one. Fourth sentence keeps going with plenty of words to say. \
                    Fifth closes it out with several additional words for good measure.";
        let snippets = chunk_transcript(text);
        assert!(!snippets.is_empty());
        for pair in snippets.windows(2) {
            assert!(pair[0].timestamp_sec <= pair[1].timestamp_sec);
        }
        assert_eq!(snippets[0].timestamp_sec, 0.0);
    }

    #[test]
    fn empty_transcript_yields_no_snippets() {
        assert!(chunk_transcript("").is_empty());
        assert!(chunk_transcript("   ").is_empty());
    }

    #[test]
    fn unpunctuated_text_is_one_chunk_seed() {
        let snippets = chunk_transcript("no punctuation at all just words");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].timestamp_sec, 0.0);
    }

    #[tokio::test]
    async fn silent_phases_yield_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ArtifactStore::new(dir.path());
        let artifacts: BTreeMap<Phase, PhaseArtifact> = PHASE_ORDER
            .iter()
            .map(|p| (*p, artifact(*p, None)))
            .collect();

        let result = transcribe_phases(Arc::new(FixedStt("hello")), &storage, &artifacts)
            .await
            .unwrap();

        assert_eq!(result.len(), 4);
        assert!(result.values().all(|v| v.is_empty()));
    }

    #[tokio::test]
    async fn best_effort_policy_degrades_failed_phases_to_silence() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ArtifactStore::new(dir.path());
        let id = uuid::Uuid::new_v4();
        let url = storage
            .store_audio(id, Phase::Design, "audio/webm", b"audio")
            .await
            .unwrap();

        let mut artifacts: BTreeMap<Phase, PhaseArtifact> = PHASE_ORDER
            .iter()
            .map(|p| (*p, artifact(*p, None)))
            .collect();
        artifacts.insert(Phase::Design, artifact(Phase::Design, Some(url)));

        let result = transcribe_phases_with_policy(
            Arc::new(FailingStt),
            &storage,
            &artifacts,
            FailurePolicy::BestEffort,
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 4);
        assert!(result[&Phase::Design].is_empty());
    }

    #[tokio::test]
    async fn provider_error_fails_with_phase_tag() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ArtifactStore::new(dir.path());
        let id = uuid::Uuid::new_v4();
        let url = storage
            .store_audio(id, Phase::Design, "audio/webm", b"audio")
            .await
            .unwrap();

        let mut artifacts: BTreeMap<Phase, PhaseArtifact> = PHASE_ORDER
            .iter()
            .map(|p| (*p, artifact(*p, None)))
            .collect();
        artifacts.insert(Phase::Design, artifact(Phase::Design, Some(url)));

        let err = transcribe_phases(Arc::new(FailingStt), &storage, &artifacts)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "transcription_failed: design");
    }

    #[tokio::test]
    async fn audio_phases_get_chunked_snippets() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ArtifactStore::new(dir.path());
        let id = uuid::Uuid::new_v4();
        let url = storage
            .store_audio(id, Phase::Clarify, "audio/webm", b"audio")
            .await
            .unwrap();

        let mut artifacts: BTreeMap<Phase, PhaseArtifact> = PHASE_ORDER
            .iter()
            .map(|p| (*p, artifact(*p, None)))
            .collect();
        artifacts.insert(Phase::Clarify, artifact(Phase::Clarify, Some(url)));

        let result = transcribe_phases(
            Arc::new(FixedStt("We need ten million URLs per month. That is about four thousand per second.")),
            &storage,
            &artifacts,
        )
        .await
        .unwrap();

        assert!(!result[&Phase::Clarify].is_empty());
        assert!(result[&Phase::Estimate].is_empty());
    }
}
