use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CuckooError {
    #[error("Path {} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Cuckoo CWD {} does not yet exist", path.display())]
    CwdNotFound { path: PathBuf },

    #[error("Path {} is not a valid Cuckoo CWD: {reason}", path.display())]
    InvalidCwd { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required value: {field}")]
    MissingField { field: String },

    #[error("{message}")]
    SubmissionError { message: String },

    #[error("Failure during startup: {message}")]
    StartupError { message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Settings,
    Submission,
    Startup,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CuckooError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn submission(message: impl Into<String>) -> Self {
        Self::SubmissionError {
            message: message.into(),
        }
    }

    pub fn startup(message: impl Into<String>) -> Self {
        Self::StartupError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyExists { .. }
            | Self::CwdNotFound { .. }
            | Self::InvalidCwd { .. }
            | Self::ConfigError { .. }
            | Self::TomlError(_)
            | Self::TomlWriteError(_) => ErrorCategory::Configuration,
            Self::InvalidValue { .. } | Self::MissingField { .. } => ErrorCategory::Settings,
            Self::SubmissionError { .. } | Self::ApiError(_) => ErrorCategory::Submission,
            Self::StartupError { .. } => ErrorCategory::Startup,
            Self::ZipError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Settings | ErrorCategory::Submission => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Startup => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for an error that reached the top level. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// Name of the offending field for settings errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } | Self::MissingField { field } => Some(field),
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::CwdNotFound { path } => format!(
                "Cuckoo CWD {} does not yet exist. Run 'cuckoo create-working-directory' if this \
                 is the first time you are running Cuckoo with this CWD path",
                path.display()
            ),
            Self::InvalidCwd { path, reason } => {
                format!("Invalid Cuckoo working directory {}: {}", path.display(), reason)
            }
            Self::InvalidValue { .. } | Self::MissingField { .. } => {
                format!("Submission failed: {}", self)
            }
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => {
                "Use --regen-configs or --create-missing-directories to repair an existing CWD"
            }
            Self::CwdNotFound { .. } => "Create it with 'cuckoo create-working-directory'",
            Self::InvalidCwd { .. } => "Point --cwd at a directory created by Cuckoo",
            Self::ConfigError { .. } | Self::TomlError(_) | Self::TomlWriteError(_) => {
                "Check the configuration files under the CWD conf/ directory"
            }
            Self::InvalidValue { .. } | Self::MissingField { .. } => {
                "Check the submission options and the limits in conf/analysissettings.toml"
            }
            Self::SubmissionError { .. } | Self::ApiError(_) => {
                "Check that the target is reachable and Cuckoo is running"
            }
            Self::StartupError { .. } => "Inspect the log output above for the failing component",
            Self::ZipError(_) => "Make sure the file is a valid Cuckoo monitor zip",
            Self::IoError(_) | Self::SerializationError(_) => {
                "Check file permissions and available disk space"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CuckooError>;
