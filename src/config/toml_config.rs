use crate::core::cwd::WorkingDirectory;
use crate::core::settings::SettingsLimits;
use crate::utils::error::{CuckooError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CUCKOO_CONFIG: &str = "cuckoo.toml";
pub const ANALYSIS_SETTINGS_CONFIG: &str = "analysissettings.toml";

/// `conf/cuckoo.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuckooConfig {
    #[serde(default)]
    pub state_controller: StateControllerConfig,
    #[serde(default)]
    pub subsystems: SubsystemCommands,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateControllerConfig {
    /// Socket path, relative paths resolve against the CWD.
    #[serde(default = "default_state_controller_socket")]
    pub socket: String,
}

impl Default for StateControllerConfig {
    fn default() -> Self {
        Self {
            socket: default_state_controller_socket(),
        }
    }
}

fn default_state_controller_socket() -> String {
    "operational/sockets/statecontroller.sock".to_string()
}

/// Argument vectors used to launch each subsystem. Empty means not configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubsystemCommands {
    #[serde(default)]
    pub standalone: Vec<String>,
    #[serde(default)]
    pub distributed: Vec<String>,
    #[serde(default)]
    pub importmode: Vec<String>,
    #[serde(default)]
    pub web: Vec<String>,
    #[serde(default)]
    pub api: Vec<String>,
    #[serde(default)]
    pub web_command: Vec<String>,
    #[serde(default)]
    pub api_command: Vec<String>,
}

/// `conf/analysissettings.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSettingsConfig {
    #[serde(default)]
    pub limits: SettingsLimits,
}

impl CuckooConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_toml(path.as_ref())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        parse_toml(content)
    }

    /// Loads the main configuration of a CWD. The file must exist.
    pub fn load(cwd: &WorkingDirectory) -> Result<Self> {
        let path = cwd.conf_path(CUCKOO_CONFIG);
        if !path.is_file() {
            return Err(CuckooError::config(format!(
                "Missing configuration file {}. Run 'cuckoo create-working-directory --regen-configs'",
                path.display()
            )));
        }

        let config = Self::from_file(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Absolute location of the state controller socket.
    pub fn state_controller_socket(&self, cwd: &WorkingDirectory) -> std::path::PathBuf {
        let socket = Path::new(&self.state_controller.socket);
        if socket.is_absolute() {
            socket.to_path_buf()
        } else {
            cwd.root().join(socket)
        }
    }
}

impl Validate for CuckooConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string(
            "state_controller.socket",
            &self.state_controller.socket,
        )
    }
}

impl AnalysisSettingsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        parse_toml(content)
    }

    /// Falls back to built-in limits when the CWD has no analysis settings file.
    pub fn load(cwd: &WorkingDirectory) -> Result<Self> {
        let path = cwd.conf_path(ANALYSIS_SETTINGS_CONFIG);
        if !path.is_file() {
            tracing::debug!("{} not found, using default limits", path.display());
            return Ok(Self::default());
        }

        let config: Self = read_toml(&path)?;
        config.validate()?;
        Ok(config)
    }
}

impl Validate for AnalysisSettingsConfig {
    fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        validation::validate_range("limits.max_timeout", limits.max_timeout, 1, u64::MAX)?;
        validation::validate_range("limits.max_priority", limits.max_priority, 1, u32::MAX)?;
        validation::validate_range("limits.max_platforms", limits.max_platforms, 1, usize::MAX)?;
        Ok(())
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content).map_err(|e| {
        CuckooError::config(format!("Failed to load {}: {}", path.display(), e))
    })
}

fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    let processed = substitute_env_vars(content)?;
    Ok(toml::from_str(&processed)?)
}

/// Replaces `${VAR}` with the value of the environment variable. Unknown
/// variables are left as they are.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| CuckooError::config(format!("Invalid substitution pattern: {}", e)))?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}
