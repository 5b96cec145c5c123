use crate::domain::model::{Platform, Settings};
use crate::utils::error::{CuckooError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_required_field};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsLimits {
    #[serde(default = "default_max_timeout")]
    pub max_timeout: u64,
    #[serde(default = "default_max_priority")]
    pub max_priority: u32,
    #[serde(default = "default_max_platforms")]
    pub max_platforms: usize,
}

impl Default for SettingsLimits {
    fn default() -> Self {
        Self {
            max_timeout: default_max_timeout(),
            max_priority: default_max_priority(),
            max_platforms: default_max_platforms(),
        }
    }
}

fn default_max_timeout() -> u64 {
    300
}

fn default_max_priority() -> u32 {
    999
}

fn default_max_platforms() -> usize {
    3
}

/// Collects submission parameters and turns them into a validated `Settings`.
///
/// Platforms are kept in the order they were added, duplicates included.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    limits: SettingsLimits,
    timeout: Option<u64>,
    priority: Option<u32>,
    manual: Option<bool>,
    platforms: Vec<Platform>,
    available: Option<Vec<Platform>>,
}

impl SettingsBuilder {
    pub fn new(limits: SettingsLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn timeout(&mut self, seconds: u64) -> &mut Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn priority(&mut self, value: u32) -> &mut Self {
        self.priority = Some(value);
        self
    }

    pub fn manual(&mut self, manual: bool) -> &mut Self {
        self.manual = Some(manual);
        self
    }

    pub fn add_platform(&mut self, platform: &str, os_version: Option<&str>) -> &mut Self {
        self.platforms.push(Platform {
            platform: platform.to_string(),
            os_version: os_version.map(str::to_string),
        });
        self
    }

    /// Restricts requested platforms to what these machines can run. Without
    /// this call any platform is accepted.
    pub fn available_platforms(&mut self, machines: Vec<Platform>) -> &mut Self {
        self.available = Some(machines);
        self
    }

    /// Adds a platform from a `platform` or `platform,os_version` token.
    pub fn add_platform_token(&mut self, token: &str) -> &mut Self {
        let (platform, os_version) = parse_platform(token);
        self.add_platform(platform, os_version)
    }

    /// Validates timeout, priority and platforms, in that order.
    pub fn build(&self) -> Result<Settings> {
        let timeout = *validate_required_field("timeout", &self.timeout)?;
        validate_range("timeout", timeout, 1, self.limits.max_timeout)?;

        let priority = *validate_required_field("priority", &self.priority)?;
        validate_range("priority", priority, 1, self.limits.max_priority)?;

        if self.platforms.len() > self.limits.max_platforms {
            return Err(CuckooError::InvalidValue {
                field: "platforms".to_string(),
                value: self.platforms.len().to_string(),
                reason: format!("At most {} platforms can be given", self.limits.max_platforms),
            });
        }
        for entry in &self.platforms {
            validate_non_empty_string("platform", &entry.platform)?;
            if let Some(os_version) = &entry.os_version {
                validate_non_empty_string("os_version", os_version)?;
            }
        }
        if let Some(available) = &self.available {
            for entry in &self.platforms {
                if !available.iter().any(|machine| machine_runs(machine, entry)) {
                    return Err(CuckooError::InvalidValue {
                        field: "platform".to_string(),
                        value: match &entry.os_version {
                            Some(version) => format!("{},{}", entry.platform, version),
                            None => entry.platform.clone(),
                        },
                        reason: "No configured machine runs this platform".to_string(),
                    });
                }
            }
        }

        Ok(Settings {
            timeout,
            priority,
            manual: self.manual.unwrap_or(false),
            platforms: self.platforms.clone(),
        })
    }
}

/// A request without an OS version matches any version of its platform.
fn machine_runs(machine: &Platform, requested: &Platform) -> bool {
    if machine.platform != requested.platform {
        return false;
    }
    match &requested.os_version {
        Some(version) => machine.os_version.as_ref() == Some(version),
        None => true,
    }
}

/// Splits on the first comma only; the rest belongs to the OS version.
pub fn parse_platform(token: &str) -> (&str, Option<&str>) {
    match token.split_once(',') {
        Some((platform, os_version)) => (platform, Some(os_version)),
        None => (token, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SettingsBuilder {
        let mut builder = SettingsBuilder::new(SettingsLimits::default());
        builder.timeout(120).priority(1);
        builder
    }

    #[test]
    fn test_platform_tokens() {
        let mut builder = builder();
        builder.add_platform_token("windows,10").add_platform_token("linux");

        let settings = builder.build().unwrap();

        assert_eq!(
            settings.platforms(),
            &[
                Platform {
                    platform: "windows".to_string(),
                    os_version: Some("10".to_string()),
                },
                Platform {
                    platform: "linux".to_string(),
                    os_version: None,
                },
            ]
        );
        assert!(!settings.manual());
    }

    #[test]
    fn test_parse_platform_splits_once() {
        assert_eq!(parse_platform("windows"), ("windows", None));
        assert_eq!(parse_platform("windows,10"), ("windows", Some("10")));
        assert_eq!(
            parse_platform("windows,10,21H2"),
            ("windows", Some("10,21H2"))
        );
    }

    #[test]
    fn test_duplicate_platforms_are_kept() {
        let mut builder = builder();
        builder
            .add_platform_token("windows,10")
            .add_platform_token("windows,10");

        assert_eq!(builder.build().unwrap().platforms().len(), 2);
    }

    #[test]
    fn test_missing_timeout_is_reported_first() {
        let mut builder = SettingsBuilder::new(SettingsLimits::default());
        builder.priority(0);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, CuckooError::MissingField { ref field } if field == "timeout"));
    }

    #[test]
    fn test_out_of_range_values() {
        let mut builder = builder();
        builder.timeout(0);
        assert_eq!(builder.build().unwrap_err().field(), Some("timeout"));

        builder.timeout(301);
        assert_eq!(builder.build().unwrap_err().field(), Some("timeout"));

        builder.timeout(300).priority(1000);
        assert_eq!(builder.build().unwrap_err().field(), Some("priority"));

        builder.priority(999).manual(true);
        let settings = builder.build().unwrap();
        assert_eq!(settings.timeout(), 300);
        assert!(settings.manual());
    }

    #[test]
    fn test_invalid_platforms() {
        let mut builder = builder();
        builder.add_platform_token(",10");
        assert_eq!(builder.build().unwrap_err().field(), Some("platform"));

        let mut builder = self::builder();
        builder.add_platform_token("windows,");
        assert_eq!(builder.build().unwrap_err().field(), Some("os_version"));

        let mut builder = self::builder();
        for _ in 0..4 {
            builder.add_platform_token("linux");
        }
        assert_eq!(builder.build().unwrap_err().field(), Some("platforms"));
    }

    #[test]
    fn test_platforms_must_match_a_configured_machine() {
        let machines = vec![
            Platform {
                platform: "windows".to_string(),
                os_version: Some("10".to_string()),
            },
            Platform {
                platform: "linux".to_string(),
                os_version: None,
            },
        ];

        let mut builder = builder();
        builder
            .available_platforms(machines.clone())
            .add_platform_token("windows,10")
            .add_platform_token("windows")
            .add_platform_token("linux");
        assert!(builder.build().is_ok());

        let mut builder = self::builder();
        builder
            .available_platforms(machines.clone())
            .add_platform_token("amigaos,3.1");
        let err = builder.build().unwrap_err();
        assert_eq!(err.field(), Some("platform"));
        assert!(err.to_string().contains("amigaos,3.1"));

        let mut builder = self::builder();
        builder
            .available_platforms(machines)
            .add_platform_token("linux,22.04");
        assert_eq!(builder.build().unwrap_err().field(), Some("platform"));

        let mut builder = self::builder();
        builder.available_platforms(Vec::new());
        assert!(builder.build().is_ok());
        builder.add_platform_token("windows");
        assert!(builder.build().is_err());
    }
}
