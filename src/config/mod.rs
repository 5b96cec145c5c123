#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::cwd::WorkingDirectory;
use crate::utils::error::{CuckooError, Result};
use std::path::{Path, PathBuf};

/// Directory name used when no `--cwd` is given.
pub const DEFAULT_CWD_NAME: &str = ".cuckoocwd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Quiet,
}

impl LogLevel {
    /// Verbose wins over debug, debug over quiet.
    pub fn from_flags(verbose: bool, debug: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if debug {
            Self::Debug
        } else if quiet {
            Self::Quiet
        } else {
            Self::Info
        }
    }

    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::Verbose => "debug",
            Self::Debug => "cuckoo_cli=debug,info",
            Self::Info => "cuckoo_cli=info,warn",
            Self::Quiet => "warn",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Quiet => "warning",
        }
    }
}

/// Process-wide settings resolved once in `main` and passed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    cwd: WorkingDirectory,
    log_level: LogLevel,
}

impl AppConfig {
    pub fn new(cwd_path: impl Into<PathBuf>, log_level: LogLevel) -> Self {
        Self {
            cwd: WorkingDirectory::new(cwd_path),
            log_level,
        }
    }

    pub fn cwd(&self) -> &WorkingDirectory {
        &self.cwd
    }

    pub fn cwd_path(&self) -> &Path {
        self.cwd.root()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

/// `~/.cuckoocwd`. Never falls back to a path relative to the process directory.
pub fn default_cwd_path() -> Result<PathBuf> {
    dirs::home_dir()
        .filter(|home| home.is_absolute())
        .map(|home| home.join(DEFAULT_CWD_NAME))
        .ok_or_else(|| {
            CuckooError::config("Could not determine the home directory. Pass the CWD with --cwd")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(LogLevel::from_flags(true, true, true), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(false, true, true), LogLevel::Debug);
        assert_eq!(LogLevel::from_flags(false, false, true), LogLevel::Quiet);
        assert_eq!(LogLevel::from_flags(false, false, false), LogLevel::Info);
    }

    #[test]
    fn test_app_config_exposes_cwd() {
        let config = AppConfig::new("/srv/cuckoo", LogLevel::Info);
        assert_eq!(config.cwd_path(), Path::new("/srv/cuckoo"));
        assert_eq!(config.log_level().as_str(), "info");
    }

    #[test]
    fn test_default_cwd_is_absolute() {
        if let Ok(path) = default_cwd_path() {
            assert!(path.is_absolute());
            assert!(path.ends_with(DEFAULT_CWD_NAME));
        }
    }
}
