//! Filesystem artifact store
//!
//! Canvas snapshots and audio recordings live under the configured upload
//! directory, one subdirectory per submission. Stored files are addressed
//! by stable `/uploads/...` URLs; `resolve_url` maps a URL back to its
//! on-disk path for the transcription stage.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tribunal_common::Phase;
use uuid::Uuid;

/// URL prefix under which stored artifacts are addressable
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Canvas MIME types accepted at intake
pub const CANVAS_MIMES: [&str; 2] = ["image/png", "image/jpeg"];

/// Audio MIME types accepted at intake, with their file extensions
pub const AUDIO_MIMES: [(&str, &str); 6] = [
    ("audio/webm", "webm"),
    ("audio/mp4", "m4a"),
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/wav", "wav"),
    ("audio/ogg", "ogg"),
];

/// Content-addressed-enough blob store rooted at the upload directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create upload dir {}", self.root.display()))?;
        Ok(())
    }

    /// Store a canvas snapshot, returning its stable URL
    pub async fn store_canvas(
        &self,
        submission_id: Uuid,
        phase: Phase,
        mime: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let ext = if mime == "image/jpeg" { "jpg" } else { "png" };
        self.store(submission_id, &format!("canvas_{phase}.{ext}"), bytes)
            .await
    }

    /// Store a phase audio recording, returning its stable URL
    pub async fn store_audio(
        &self,
        submission_id: Uuid,
        phase: Phase,
        mime: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let ext = AUDIO_MIMES
            .iter()
            .find(|(m, _)| *m == mime)
            .map(|(_, ext)| *ext)
            .unwrap_or("bin");
        self.store(submission_id, &format!("audio_{phase}.{ext}"), bytes)
            .await
    }

    async fn store(&self, submission_id: Uuid, file_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(submission_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        Ok(format!("{UPLOADS_PREFIX}/{submission_id}/{file_name}"))
    }

    /// Map a stored `/uploads/...` URL back to its filesystem path
    pub fn resolve_url(&self, url: &str) -> Result<PathBuf> {
        let relative = url
            .strip_prefix(&format!("{UPLOADS_PREFIX}/"))
            .ok_or_else(|| anyhow::anyhow!("not an uploads URL: {url}"))?;

        // Reject any traversal attempt in the stored URL
        if Path::new(relative)
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            anyhow::bail!("invalid artifact path: {url}");
        }

        Ok(self.root.join(relative))
    }

    /// Read a stored artifact's bytes
    pub async fn read_url(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve_url(url)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("read {}", path.display()))
    }
}

/// Whether a MIME type is an accepted canvas format
pub fn is_canvas_mime(mime: &str) -> bool {
    CANVAS_MIMES.contains(&mime)
}

/// Whether a MIME type is an accepted audio format
pub fn is_audio_mime(mime: &str) -> bool {
    AUDIO_MIMES.iter().any(|(m, _)| *m == mime)
}
