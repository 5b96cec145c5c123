use crate::domain::model::{AnalysisId, RunMode, Settings};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Where submissions end up. Calls are made one at a time, in order.
pub trait SubmissionBackend {
    fn submit_file(&self, path: &Path, settings: &Settings, file_name: &str) -> Result<AnalysisId>;

    fn submit_url(&self, url: &str, settings: &Settings) -> Result<AnalysisId>;

    /// Tells the analysis engine new submissions are waiting.
    fn notify(&self) -> Result<()>;

    fn enumerate_files(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        crate::core::cwd::enumerate_files(path)
    }
}

#[async_trait]
pub trait Subsystem: Send + Sync {
    /// Blocks until the subsystem stops.
    async fn run(&self, mode: &RunMode) -> Result<()>;
}
