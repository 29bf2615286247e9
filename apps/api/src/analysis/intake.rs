use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisError;
use crate::config::StagingConfig;

/// An uploaded document buffered to disk but not yet staged for analysis.
/// The backing temp file is deleted if this is dropped before staging.
#[derive(Debug)]
pub struct UploadedFile {
    original_name: String,
    file: NamedTempFile,
}

impl UploadedFile {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

/// A document placed at its final staging path. The file is removed on drop
/// unless uploads are configured to be retained.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    retain: bool,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staged upload {}: {e}",
                self.path.display()
            ),
        }
    }
}

/// Accepts uploaded documents and moves them into the staging directory under
/// collision-free names.
#[derive(Debug, Clone)]
pub struct DocumentIntake {
    dir: PathBuf,
    retain_uploads: bool,
    sequence: Arc<AtomicU64>,
}

impl DocumentIntake {
    /// Creates the staging directory if it does not exist yet.
    pub fn new(config: &StagingConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        Ok(Self {
            dir: config.dir.clone(),
            retain_uploads: config.retain_uploads,
            sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.dir
    }

    /// Buffers upload bytes into an anonymous temp file inside the staging
    /// directory, so that staging is a rename on the same filesystem.
    pub fn receive(&self, original_name: &str, data: &[u8]) -> Result<UploadedFile, AnalysisError> {
        let mut file = NamedTempFile::new_in(&self.dir).map_err(AnalysisError::Storage)?;
        file.write_all(data).map_err(AnalysisError::Storage)?;
        file.flush().map_err(AnalysisError::Storage)?;

        debug!("Buffered upload '{original_name}' ({} bytes)", data.len());

        Ok(UploadedFile {
            original_name: original_name.to_string(),
            file,
        })
    }

    /// Moves a received upload to its staging path.
    pub fn stage(&self, upload: Option<UploadedFile>) -> Result<StagedUpload, AnalysisError> {
        let upload = upload.ok_or(AnalysisError::NoFileProvided)?;

        let path = self.dir.join(self.staged_name(upload.original_name()));
        // Dropping the PersistError's file removes the temp file.
        upload
            .file
            .persist_noclobber(&path)
            .map_err(|e| AnalysisError::Storage(e.error))?;

        info!(
            "Staged upload '{}' at {}",
            upload.original_name,
            path.display()
        );

        Ok(StagedUpload {
            path,
            retain: self.retain_uploads,
        })
    }

    /// `<unix micros>-<sequence>_<sanitized name>`
    fn staged_name(&self, original_name: &str) -> String {
        let micros = Utc::now().timestamp_micros();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{micros}-{seq}_{}", sanitize_file_name(original_name))
    }
}

/// Keeps only the final path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
