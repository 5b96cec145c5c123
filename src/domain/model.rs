use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub os_version: Option<String>,
}

/// Validated submission settings. Only `SettingsBuilder` creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub(crate) timeout: u64,
    pub(crate) priority: u32,
    pub(crate) manual: bool,
    pub(crate) platforms: Vec<Platform>,
}

impl Settings {
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn manual(&self) -> bool {
        self.manual
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    File,
    Url,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::File => write!(f, "file"),
            TargetKind::Url => write!(f, "URL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Submitted(AnalysisId),
    Failed(String),
}

/// Outcome of one resolved submission unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub target: String,
    pub outcome: SubmissionOutcome,
}

impl SubmissionResult {
    pub fn submitted(target: impl Into<String>, analysis_id: AnalysisId) -> Self {
        Self {
            target: target.into(),
            outcome: SubmissionOutcome::Submitted(analysis_id),
        }
    }

    pub fn failed(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            outcome: SubmissionOutcome::Failed(error.into()),
        }
    }

    pub fn analysis_id(&self) -> Option<&AnalysisId> {
        match &self.outcome {
            SubmissionOutcome::Submitted(id) => Some(id),
            SubmissionOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            SubmissionOutcome::Submitted(_) => None,
            SubmissionOutcome::Failed(message) => Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SubmissionOutcome::Submitted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub autoreload: bool,
}

/// Long-running subsystem selected at startup. Exactly one runs per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Standalone,
    Distributed,
    ImportMode,
    Web(ServerOptions),
    Api(ServerOptions),
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Standalone => "standalone",
            RunMode::Distributed => "distributed",
            RunMode::ImportMode => "import mode",
            RunMode::Web(_) => "web",
            RunMode::Api(_) => "api",
        }
    }

    /// Modes that start analyses need the monitor and stager binaries.
    pub fn requires_guest_components(&self) -> bool {
        matches!(self, RunMode::Standalone | RunMode::Distributed)
    }
}
