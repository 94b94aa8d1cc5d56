//! Reply audio artifact storage
//!
//! Artifacts are addressed by output id; the path is re-derivable by any
//! consumer that knows the id. Writes go to a temp file in the target
//! directory and publish by atomic rename, so a concurrent reader never
//! observes a partial file and a prior artifact is replaced whole.

use std::io::Write as _;
use std::path::PathBuf;

use crate::{Error, Result};

/// File extension for synthesized replies
const ARTIFACT_EXT: &str = "mp3";

/// Filesystem store for synthesized reply audio
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "artifact store ready");
        Ok(Self { dir })
    }

    /// Deterministic path for an output id
    #[must_use]
    pub fn path_for(&self, output_id: &str) -> PathBuf {
        self.dir.join(format!("reply_{output_id}.{ARTIFACT_EXT}"))
    }

    /// Atomically publish audio under an output id, replacing any prior
    /// artifact at the same id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Synthesis`] for zero-byte payloads and write
    /// failures (a partial file is never left at the published path), and
    /// [`Error::Validation`] for ids that are not path-safe.
    pub fn write(&self, output_id: &str, audio: &[u8]) -> Result<PathBuf> {
        if !is_valid_output_id(output_id) {
            return Err(Error::Validation(format!(
                "output id is not path-safe: {output_id:?}"
            )));
        }
        if audio.is_empty() {
            return Err(Error::Synthesis(
                "refusing to publish a zero-byte artifact".to_string(),
            ));
        }

        let path = self.path_for(output_id);
        let publish = || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(audio)?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        };
        publish().map_err(|e| Error::Synthesis(format!("artifact write failed: {e}")))?;

        tracing::debug!(path = %path.display(), bytes = audio.len(), "artifact published");
        Ok(path)
    }

    /// Resolve an existing artifact
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no artifact exists for the id
    pub fn get(&self, output_id: &str) -> Result<PathBuf> {
        if !is_valid_output_id(output_id) {
            return Err(Error::NotFound(format!("audio artifact {output_id:?}")));
        }
        let path = self.path_for(output_id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(format!("audio artifact {output_id}")))
        }
    }
}

/// Output ids appear in filenames and URLs; restrict to a safe alphabet
/// so a caller-supplied id can never escape the artifact directory.
#[must_use]
pub fn is_valid_output_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
