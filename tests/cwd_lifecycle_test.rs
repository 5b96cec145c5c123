use cuckoo_cli::core::cwd::{create_working_directory, CwdAction, CwdState};
use cuckoo_cli::core::guest::{guest_components_present, unpack_monitor_components};
use cuckoo_cli::domain::model::RunMode;
use cuckoo_cli::{AppConfig, CuckooError, LogLevel, StartupOrchestrator, WorkingDirectory};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Relative path and content of every file below `root`.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                files.insert(relative, fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn monitor_zip(dir: &Path) -> PathBuf {
    let path = dir.join("monitor.zip");
    let mut writer = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    let options = SimpleFileOptions::default().unix_permissions(0o755);
    for (name, content) in [
        ("monitor/x64/monitor.dll", "dll"),
        ("stager/tmstage.exe", "exe"),
        ("README.txt", "ignored"),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

#[test]
fn test_second_create_fails_without_touching_files() {
    let temp = TempDir::new().unwrap();
    let cwd = WorkingDirectory::new(temp.path().join("cwd"));

    assert_eq!(
        create_working_directory(&cwd, false, false).unwrap(),
        CwdAction::Created
    );
    assert_eq!(cwd.state(), CwdState::Valid);

    fs::write(cwd.conf_path("cuckoo.toml"), "# edited by hand\n").unwrap();
    let before = snapshot(cwd.root());

    let err = create_working_directory(&cwd, false, false).unwrap_err();
    assert!(matches!(err, CuckooError::AlreadyExists { .. }));
    assert_eq!(snapshot(cwd.root()), before);
}

#[test]
fn test_repair_on_foreign_directory_is_refused() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("not-a-cwd");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("notes.txt"), "keep me").unwrap();
    let before = snapshot(&root);

    let cwd = WorkingDirectory::new(&root);
    let err = create_working_directory(&cwd, true, true).unwrap_err();

    assert!(matches!(err, CuckooError::InvalidCwd { .. }));
    assert_eq!(snapshot(&root), before);
}

#[test]
fn test_regen_restores_only_missing_configs() {
    let temp = TempDir::new().unwrap();
    let cwd = WorkingDirectory::new(temp.path().join("cwd"));
    cwd.create().unwrap();

    fs::write(cwd.conf_path("cuckoo.toml"), "# edited by hand\n").unwrap();
    fs::remove_file(cwd.conf_path("analysissettings.toml")).unwrap();

    let action = create_working_directory(&cwd, true, false).unwrap();

    assert_eq!(
        action,
        CwdAction::Repaired {
            configs: vec![cwd.conf_path("analysissettings.toml")],
            directories: vec![],
        }
    );
    assert_eq!(
        fs::read_to_string(cwd.conf_path("cuckoo.toml")).unwrap(),
        "# edited by hand\n"
    );
}

#[test]
fn test_unpacked_monitor_satisfies_start_precondition() {
    let temp = TempDir::new().unwrap();
    let cwd_path = temp.path().join("cwd");
    let config = AppConfig::new(cwd_path, LogLevel::Info);
    config.cwd().create().unwrap();

    let orchestrator = StartupOrchestrator::new(config.clone());
    assert!(orchestrator.check_preconditions(&RunMode::ImportMode).is_ok());
    let err = orchestrator
        .check_preconditions(&RunMode::Standalone)
        .unwrap_err();
    assert!(err.to_string().contains("No monitor and stager binaries"));

    let summary = unpack_monitor_components(&monitor_zip(temp.path()), config.cwd()).unwrap();

    assert_eq!((summary.monitor_files, summary.stager_files), (1, 1));
    assert!(guest_components_present(config.cwd()));
    assert!(!config.cwd_path().join("README.txt").exists());
    assert!(orchestrator.check_preconditions(&RunMode::Distributed).is_ok());
}
