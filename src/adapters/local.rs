use crate::config::toml_config::CuckooConfig;
use crate::core::cwd::WorkingDirectory;
use crate::domain::model::{AnalysisId, Settings, TargetKind};
use crate::domain::ports::SubmissionBackend;
use crate::utils::error::{CuckooError, Result};
use crate::utils::validation::validate_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUBMISSION_FILE: &str = "submission.json";
pub const BINARY_FILE: &str = "binary";

/// Written next to every untracked analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub analysis_id: AnalysisId,
    pub kind: TargetKind,
    /// Original file name, or the URL.
    pub target: String,
    pub submitted_at: DateTime<Utc>,
    pub settings: Settings,
}

/// Registers submissions as untracked analyses in the working directory and
/// wakes the state controller through its socket.
#[derive(Debug, Clone)]
pub struct LocalSubmitter {
    cwd: WorkingDirectory,
    socket: PathBuf,
}

impl LocalSubmitter {
    pub fn new(cwd: WorkingDirectory, socket: impl Into<PathBuf>) -> Self {
        Self {
            cwd,
            socket: socket.into(),
        }
    }

    pub fn from_config(cwd: &WorkingDirectory, config: &CuckooConfig) -> Self {
        Self::new(cwd.clone(), config.state_controller_socket(cwd))
    }

    /// Ids are `YYYYMMDD-NNNNNN`, the sequence restarting every day.
    fn allocate(&self) -> Result<(AnalysisId, PathBuf)> {
        let untracked = self.cwd.untracked_dir();
        fs::create_dir_all(&untracked)?;

        let prefix = format!("{}-", Utc::now().format("%Y%m%d"));
        let highest = fs::read_dir(&untracked)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_prefix(&prefix)?.parse::<u64>().ok()
            })
            .max()
            .unwrap_or(0);

        let mut next = Self::successor(&prefix, highest)?;
        loop {
            let analysis_id = AnalysisId::new(format!("{}{:06}", prefix, next));
            let dir = untracked.join(analysis_id.as_str());
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((analysis_id, dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    next = Self::successor(&prefix, next)?
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn successor(prefix: &str, current: u64) -> Result<u64> {
        current.checked_add(1).ok_or_else(|| {
            CuckooError::submission(format!(
                "No analysis ids left for {}. Clean up storage/untracked",
                prefix.trim_end_matches('-')
            ))
        })
    }

    fn store(&self, dir: &Path, binary: Option<&Path>, record: &SubmissionRecord) -> Result<()> {
        if let Some(source) = binary {
            fs::copy(source, dir.join(BINARY_FILE))?;
        }
        fs::write(
            dir.join(SUBMISSION_FILE),
            serde_json::to_string_pretty(record)?,
        )?;
        Ok(())
    }

    fn register(
        &self,
        kind: TargetKind,
        target: &str,
        binary: Option<&Path>,
        settings: &Settings,
    ) -> Result<AnalysisId> {
        let (analysis_id, dir) = self.allocate()?;
        let record = SubmissionRecord {
            analysis_id: analysis_id.clone(),
            kind,
            target: target.to_string(),
            submitted_at: Utc::now(),
            settings: settings.clone(),
        };

        if let Err(e) = self.store(&dir, binary, &record) {
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }

        tracing::debug!("Registered untracked analysis {} for {}", analysis_id, target);
        Ok(analysis_id)
    }
}

impl SubmissionBackend for LocalSubmitter {
    fn submit_file(&self, path: &Path, settings: &Settings, file_name: &str) -> Result<AnalysisId> {
        let metadata = fs::metadata(path).map_err(|e| {
            CuckooError::submission(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(CuckooError::submission("Not a regular file"));
        }
        if metadata.len() == 0 {
            return Err(CuckooError::submission("Submitted file is empty"));
        }

        self.register(TargetKind::File, file_name, Some(path), settings)
    }

    fn submit_url(&self, url: &str, settings: &Settings) -> Result<AnalysisId> {
        validate_url("url", url).map_err(|e| CuckooError::submission(e.to_string()))?;
        self.register(TargetKind::Url, url, None, settings)
    }

    #[cfg(unix)]
    fn notify(&self) -> Result<()> {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let mut stream = UnixStream::connect(&self.socket).map_err(|e| {
            CuckooError::submission(format!(
                "Could not notify the state controller at {}: {}. New analyses are picked up \
                 when Cuckoo starts.",
                self.socket.display(),
                e
            ))
        })?;

        let mut message = serde_json::to_vec(&serde_json::json!({ "subject": "tracknew" }))?;
        message.push(b'\n');
        stream.write_all(&message)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn notify(&self) -> Result<()> {
        Err(CuckooError::submission(
            "Notifying the state controller requires a UNIX socket",
        ))
    }
}
