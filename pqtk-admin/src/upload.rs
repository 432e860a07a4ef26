//! Sample upload admission control
//!
//! An [`UploadQueue`] collects candidate audio files before one multipart
//! submission. Each candidate is checked on its own; a failing file is
//! excluded with a warning notice and never blocks the rest of the batch.
//!
//! Checks, in order:
//! 1. Audio: declared `audio/*` content type or audio magic bytes
//! 2. Size: at most [`UploadLimits::MAX_FILE_BYTES`]
//! 3. Name: not a case-insensitive duplicate of a pending file or pool sample
//! 4. Ceiling: existing + pending + selected library samples stay within the limit

use crate::error::UploadRejection;
use pqtk_common::events::NoticeBus;
use pqtk_common::models::RatedSample;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Size and count limits for one upload surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub ceiling: usize,
}

impl UploadLimits {
    pub const MAX_FILE_BYTES: u64 = 6 * 1024 * 1024;
    pub const EXPERIMENT_CEILING: usize = 100;
    pub const LIBRARY_CEILING: usize = 200;

    /// Per-experiment sample pool
    pub fn experiment() -> Self {
        Self {
            max_file_bytes: Self::MAX_FILE_BYTES,
            ceiling: Self::EXPERIMENT_CEILING,
        }
    }

    /// Shared sample library
    pub fn library() -> Self {
        Self {
            max_file_bytes: Self::MAX_FILE_BYTES,
            ceiling: Self::LIBRARY_CEILING,
        }
    }
}

/// A file offered for upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCandidate {
    pub name: String,
    pub content_type: Option<String>,
    /// File contents; only the leading bytes when the file is over the size cap
    pub bytes: Vec<u8>,
    size: u64,
}

/// Bytes read from an oversized file, enough for magic-byte detection
const SNIFF_BYTES: u64 = 8 * 1024;

impl UploadCandidate {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            size: bytes.len() as u64,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a candidate from disk; the file name becomes the sample name
    ///
    /// Files over [`UploadLimits::MAX_FILE_BYTES`] are not loaded: only their
    /// header is read so the queue can still report the real size.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size = tokio::fs::metadata(path).await?.len();
        if size <= UploadLimits::MAX_FILE_BYTES {
            return Ok(Self::new(name, tokio::fs::read(path).await?));
        }

        let mut header = Vec::new();
        tokio::fs::File::open(path)
            .await?
            .take(SNIFF_BYTES)
            .read_to_end(&mut header)
            .await?;
        debug!(name = %name, size, "Oversized file, read header only");
        Ok(Self {
            name,
            content_type: None,
            bytes: header,
            size,
        })
    }

    /// Size of the file on disk
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether `bytes` holds only part of the file
    pub fn is_partial(&self) -> bool {
        (self.bytes.len() as u64) < self.size
    }

    /// Declared audio content type, else sniffed from magic bytes
    pub fn is_audio(&self) -> bool {
        match &self.content_type {
            Some(ct) if ct.trim().to_ascii_lowercase().starts_with("audio/") => true,
            _ => infer::is_audio(&self.bytes),
        }
    }

    /// Content type sent with the multipart part
    pub fn mime_type(&self) -> String {
        if let Some(ct) = &self.content_type {
            return ct.clone();
        }
        infer::get(&self.bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }
}

/// Everything one submission sends
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub files: Vec<UploadCandidate>,
    /// Library samples copied into the experiment
    pub sample_ids: Vec<String>,
}

impl UploadBatch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.sample_ids.is_empty()
    }
}

#[derive(Debug)]
pub struct UploadQueue {
    limits: UploadLimits,
    /// Experiment name when uploading into an experiment pool
    experiment: Option<String>,
    /// Lowercased names already in the pool or library
    existing: Vec<String>,
    pending: Vec<UploadCandidate>,
    selected: Vec<String>,
    notices: NoticeBus,
}

impl UploadQueue {
    /// Queue for an experiment whose pool holds `pool` asset paths
    pub fn for_experiment(experiment: &str, pool: &[String], notices: NoticeBus) -> Self {
        Self {
            limits: UploadLimits::experiment(),
            experiment: Some(experiment.to_string()),
            existing: pool.iter().map(|p| p.to_lowercase()).collect(),
            pending: Vec::new(),
            selected: Vec::new(),
            notices,
        }
    }

    /// Queue for the shared library
    pub fn for_library(library: &[RatedSample], notices: NoticeBus) -> Self {
        Self {
            limits: UploadLimits::library(),
            experiment: None,
            existing: library.iter().map(|s| s.name.to_lowercase()).collect(),
            pending: Vec::new(),
            selected: Vec::new(),
            notices,
        }
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn pending(&self) -> &[UploadCandidate] {
        &self.pending
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Existing + pending + selected
    pub fn total(&self) -> usize {
        self.existing.len() + self.pending.len() + self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.selected.is_empty()
    }

    /// Admit every acceptable candidate; returns the ones kept out
    pub fn offer(&mut self, candidates: Vec<UploadCandidate>) -> Vec<UploadRejection> {
        let mut rejected = Vec::new();
        for candidate in candidates {
            match self.check(&candidate) {
                Ok(()) => {
                    debug!(name = %candidate.name, size = candidate.size(), "Queued sample");
                    self.pending.push(candidate);
                }
                Err(rejection) => {
                    self.notices.warning(rejection.to_string());
                    rejected.push(rejection);
                }
            }
        }
        rejected
    }

    fn check(&self, candidate: &UploadCandidate) -> Result<(), UploadRejection> {
        let name = candidate.name.clone();

        if !candidate.is_audio() {
            return Err(UploadRejection::NotAudio { name });
        }

        if candidate.size() > self.limits.max_file_bytes || candidate.is_partial() {
            return Err(UploadRejection::TooLarge {
                name,
                size: candidate.size(),
                max_mib: self.limits.max_file_bytes / (1024 * 1024),
            });
        }

        if self.is_duplicate(&candidate.name) {
            return Err(UploadRejection::Duplicate { name });
        }

        if self.total() + 1 > self.limits.ceiling {
            return Err(UploadRejection::OverCeiling {
                name,
                ceiling: self.limits.ceiling,
            });
        }

        Ok(())
    }

    fn is_duplicate(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let prefixed = self
            .experiment
            .as_ref()
            .map(|exp| format!("{}/{}", exp, name).to_lowercase());

        self.pending.iter().any(|p| p.name.to_lowercase() == lower)
            || self
                .existing
                .iter()
                .any(|e| *e == lower || prefixed.as_deref() == Some(e.as_str()))
    }

    /// Select or deselect a library sample to copy into the experiment
    ///
    /// Returns whether the sample is selected afterwards. Selecting past the
    /// ceiling is refused with a warning.
    pub fn toggle_existing(&mut self, sample_id: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|s| s == sample_id) {
            self.selected.remove(pos);
            return false;
        }
        if self.total() + 1 > self.limits.ceiling {
            let rejection = UploadRejection::OverCeiling {
                name: sample_id.to_string(),
                ceiling: self.limits.ceiling,
            };
            self.notices.warning(rejection.to_string());
            return false;
        }
        self.selected.push(sample_id.to_string());
        true
    }

    /// Consume the queue into one submission
    pub fn into_batch(self) -> UploadBatch {
        UploadBatch {
            files: self.pending,
            sample_ids: self.selected,
        }
    }
}
