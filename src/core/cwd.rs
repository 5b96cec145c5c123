use crate::core::templates::CONFIG_TEMPLATES;
use crate::utils::error::{CuckooError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File whose presence marks a directory as a Cuckoo working directory.
pub const CWD_MARKER: &str = ".cuckoocwd";

pub const CWD_DIRECTORIES: &[&str] = &[
    "conf",
    "conf/machineries",
    "log",
    "storage/analyses",
    "storage/untracked",
    "storage/binaries",
    "storage/importables",
    "storage/exported",
    "operational/sockets",
    "operational/generated",
    "monitor",
    "stager",
    "safelist",
    "signatures",
];

const MARKER_CONTENT: &str = "This is a Cuckoo working directory. Do not remove this file.\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CwdState {
    Nonexistent,
    Invalid(String),
    Valid,
}

/// What `create_working_directory` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CwdAction {
    Created,
    Repaired {
        configs: Vec<PathBuf>,
        directories: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    root: PathBuf,
}

impl WorkingDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True for any filesystem entry at the root path, including dangling symlinks.
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.root).is_ok()
    }

    /// Checks the structural markers only, not the contents of any file.
    pub fn validate(&self) -> Validation {
        if !self.root.is_dir() {
            return Validation::Invalid(format!("{} is not a directory", self.root.display()));
        }
        if !self.root.join(CWD_MARKER).is_file() {
            return Validation::Invalid(format!("marker file {} is missing", CWD_MARKER));
        }
        if !self.root.join("conf").is_dir() {
            return Validation::Invalid("configuration directory conf/ is missing".to_string());
        }
        Validation::Valid
    }

    pub fn state(&self) -> CwdState {
        if !self.exists() {
            return CwdState::Nonexistent;
        }
        match self.validate() {
            Validation::Valid => CwdState::Valid,
            Validation::Invalid(reason) => CwdState::Invalid(reason),
        }
    }

    /// Fails unless the CWD exists and is valid.
    pub fn require_valid(&self) -> Result<()> {
        match self.state() {
            CwdState::Valid => Ok(()),
            CwdState::Nonexistent => Err(CuckooError::CwdNotFound {
                path: self.root.clone(),
            }),
            CwdState::Invalid(reason) => Err(CuckooError::InvalidCwd {
                path: self.root.clone(),
                reason,
            }),
        }
    }

    /// Builds the directory skeleton, marker and configuration files.
    pub fn create(&self) -> Result<()> {
        if self.exists() {
            return Err(CuckooError::AlreadyExists {
                path: self.root.clone(),
            });
        }

        fs::create_dir_all(&self.root)?;
        for dir in CWD_DIRECTORIES {
            fs::create_dir_all(self.root.join(dir))?;
        }
        fs::write(self.root.join(CWD_MARKER), MARKER_CONTENT)?;
        self.write_missing_configs()?;

        tracing::info!("Created working directory at {}", self.root.display());
        Ok(())
    }

    /// Writes configuration files that do not exist yet. Existing files are
    /// never touched.
    pub fn regenerate_configs(&self) -> Result<Vec<PathBuf>> {
        self.require_repairable()?;
        self.write_missing_configs()
    }

    pub fn create_missing_directories(&self) -> Result<Vec<PathBuf>> {
        self.require_repairable()?;

        let mut created = Vec::new();
        for dir in CWD_DIRECTORIES {
            let path = self.root.join(dir);
            if !path.is_dir() {
                fs::create_dir_all(&path)?;
                tracing::debug!("Created missing directory {}", path.display());
                created.push(path);
            }
        }
        Ok(created)
    }

    /// Repairs refuse anything `validate` rejects, a missing root included.
    fn require_repairable(&self) -> Result<()> {
        match self.validate() {
            Validation::Valid => Ok(()),
            Validation::Invalid(reason) => Err(CuckooError::InvalidCwd {
                path: self.root.clone(),
                reason,
            }),
        }
    }

    fn write_missing_configs(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (relative, content) in CONFIG_TEMPLATES {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(content.as_bytes())?;

            tracing::debug!("Wrote configuration file {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    pub fn conf_path(&self, name: &str) -> PathBuf {
        self.root.join("conf").join(name)
    }

    pub fn machinery_conf_path(&self, machinery: &str) -> PathBuf {
        self.root
            .join("conf")
            .join("machineries")
            .join(format!("{}.toml", machinery))
    }

    pub fn monitor_dir(&self) -> PathBuf {
        self.root.join("monitor")
    }

    pub fn stager_dir(&self) -> PathBuf {
        self.root.join("stager")
    }

    pub fn untracked_dir(&self) -> PathBuf {
        self.root.join("storage").join("untracked")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }
}

/// Runs the create-working-directory state machine.
///
/// A missing CWD is created regardless of the repair flags. An existing one
/// is only touched when a repair was requested and it passes validation;
/// both repairs run when both flags are set.
pub fn create_working_directory(
    cwd: &WorkingDirectory,
    regen_configs: bool,
    create_missing_dirs: bool,
) -> Result<CwdAction> {
    if !cwd.exists() {
        cwd.create()?;
        return Ok(CwdAction::Created);
    }

    if !regen_configs && !create_missing_dirs {
        return Err(CuckooError::AlreadyExists {
            path: cwd.root().to_path_buf(),
        });
    }

    if let Validation::Invalid(reason) = cwd.validate() {
        return Err(CuckooError::InvalidCwd {
            path: cwd.root().to_path_buf(),
            reason,
        });
    }

    let configs = if regen_configs {
        cwd.regenerate_configs()?
    } else {
        Vec::new()
    };
    let directories = if create_missing_dirs {
        cwd.create_missing_directories()?
    } else {
        Vec::new()
    };

    Ok(CwdAction::Repaired {
        configs,
        directories,
    })
}

/// A file resolves to itself; a directory to every regular file below it,
/// sorted by path. Symlinked directories are not followed.
pub fn enumerate_files(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let entry_path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                pending.push(entry_path);
            } else if file_type.is_file() {
                files.push(entry_path);
            } else if file_type.is_symlink() && entry_path.is_file() {
                files.push(entry_path);
            }
        }
    }

    files.sort();
    Ok(files)
}
