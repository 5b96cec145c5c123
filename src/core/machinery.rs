use crate::core::cwd::WorkingDirectory;
use crate::domain::model::Platform;
use crate::utils::error::{CuckooError, Result};
use crate::utils::validation::{validate_ip_address, validate_non_empty_string};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// A machine entry as written to `conf/machineries/<machinery>.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineSpec {
    #[serde(skip)]
    pub name: String,
    pub label: String,
    pub ip: String,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub tags: Vec<String>,
}

/// Comma separated tags, blanks dropped.
pub fn parse_tags(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn add_machine(cwd: &WorkingDirectory, machinery: &str, machine: &MachineSpec) -> Result<PathBuf> {
    let name_pattern = Regex::new(r"^[a-z0-9_]+$")
        .map_err(|e| CuckooError::config(format!("Invalid machinery pattern: {}", e)))?;
    if !name_pattern.is_match(machinery) {
        return Err(CuckooError::InvalidValue {
            field: "machinery".to_string(),
            value: machinery.to_string(),
            reason: "Only lowercase letters, digits and underscores are allowed".to_string(),
        });
    }

    validate_non_empty_string("name", &machine.name)?;
    validate_non_empty_string("label", &machine.label)?;
    validate_non_empty_string("platform", &machine.platform)?;
    validate_ip_address("ip", &machine.ip)?;

    let path = cwd.machinery_conf_path(machinery);
    if !path.is_file() {
        return Err(CuckooError::config(format!(
            "Machinery '{}' has no configuration file at {}",
            machinery,
            path.display()
        )));
    }

    let raw = fs::read_to_string(&path)?;
    let mut document: toml::Table = toml::from_str(&raw)?;

    let machines = document
        .entry("machines")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()))
        .as_table_mut()
        .ok_or_else(|| {
            CuckooError::config(format!("'machines' in {} is not a table", path.display()))
        })?;

    if machines.contains_key(&machine.name) {
        return Err(CuckooError::config(format!(
            "Machine '{}' already exists in machinery '{}'",
            machine.name, machinery
        )));
    }
    machines.insert(machine.name.clone(), toml::Value::try_from(machine)?);

    fs::write(&path, toml::to_string_pretty(&document)?)?;
    tracing::debug!("Added machine {} to {}", machine.name, path.display());
    Ok(path)
}

#[derive(Debug, Default, Deserialize)]
struct MachineryFile {
    #[serde(default)]
    machines: BTreeMap<String, Platform>,
}

/// Platform and OS version of every machine in `conf/machineries/*.toml`,
/// in file then machine name order.
pub fn configured_platforms(cwd: &WorkingDirectory) -> Result<Vec<Platform>> {
    let dir = cwd.root().join("conf").join("machineries");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut platforms = Vec::new();
    for path in paths {
        let file: MachineryFile = toml::from_str(&fs::read_to_string(&path)?).map_err(|e| {
            CuckooError::config(format!("Failed to load {}: {}", path.display(), e))
        })?;
        platforms.extend(file.machines.into_values());
    }
    Ok(platforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn machine(name: &str) -> MachineSpec {
        MachineSpec {
            name: name.to_string(),
            label: format!("{}-label", name),
            ip: "192.168.30.101".to_string(),
            platform: "windows".to_string(),
            os_version: Some("10".to_string()),
            snapshot: None,
            interface: Some("br0".to_string()),
            tags: parse_tags("exe, dotnet4_7,,"),
        }
    }

    fn cwd(temp: &TempDir) -> WorkingDirectory {
        let cwd = WorkingDirectory::new(temp.path().join("cwd"));
        cwd.create().unwrap();
        cwd
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(""), Vec::<String>::new());
        assert_eq!(parse_tags(" a , b,, c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_machine_writes_entry() {
        let temp = TempDir::new().unwrap();
        let cwd = cwd(&temp);

        let path = add_machine(&cwd, "qemu", &machine("win10")).unwrap();

        let document: toml::Table = toml::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        let entry = document["machines"]["win10"].as_table().unwrap();
        assert_eq!(entry["label"].as_str(), Some("win10-label"));
        assert_eq!(entry["os_version"].as_str(), Some("10"));
        assert!(!entry.contains_key("snapshot"));
        assert_eq!(entry["tags"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_machine_is_rejected() {
        let temp = TempDir::new().unwrap();
        let cwd = cwd(&temp);

        add_machine(&cwd, "kvm", &machine("win10")).unwrap();
        let err = add_machine(&cwd, "kvm", &machine("win10")).unwrap_err();

        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_configured_platforms_across_machineries() {
        let temp = TempDir::new().unwrap();
        let cwd = cwd(&temp);
        assert!(configured_platforms(&cwd).unwrap().is_empty());

        add_machine(&cwd, "qemu", &machine("win10")).unwrap();
        let mut linux = machine("ubuntu");
        linux.platform = "linux".to_string();
        linux.os_version = None;
        add_machine(&cwd, "kvm", &linux).unwrap();

        assert_eq!(
            configured_platforms(&cwd).unwrap(),
            vec![
                Platform {
                    platform: "linux".to_string(),
                    os_version: None,
                },
                Platform {
                    platform: "windows".to_string(),
                    os_version: Some("10".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_unknown_machinery_and_bad_input() {
        let temp = TempDir::new().unwrap();
        let cwd = cwd(&temp);

        assert!(add_machine(&cwd, "virtualbox", &machine("win10")).is_err());
        assert_eq!(
            add_machine(&cwd, "../qemu", &machine("win10")).unwrap_err().field(),
            Some("machinery")
        );

        let mut bad_ip = machine("win10");
        bad_ip.ip = "not-an-ip".to_string();
        assert_eq!(add_machine(&cwd, "qemu", &bad_ip).unwrap_err().field(), Some("ip"));
    }
}
