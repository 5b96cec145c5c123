//! Monitor and stager binaries that are injected into analysis guests.

use crate::core::cwd::WorkingDirectory;
use crate::utils::error::{CuckooError, Result};
use std::fs;
use std::io;
use std::path::{Component, Path};

const COMPONENTS: [&str; 2] = ["monitor", "stager"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    pub monitor_files: usize,
    pub stager_files: usize,
}

/// Both component directories exist and hold at least one entry.
pub fn guest_components_present(cwd: &WorkingDirectory) -> bool {
    [cwd.monitor_dir(), cwd.stager_dir()]
        .iter()
        .all(|dir| dir_has_entries(dir))
}

fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Replaces the monitor and stager directories of the CWD with the contents
/// of a Cuckoo monitor zip. Entries outside `monitor/` and `stager/` are ignored.
pub fn unpack_monitor_components(zip_path: &Path, cwd: &WorkingDirectory) -> Result<UnpackSummary> {
    if !zip_path.is_file() {
        return Err(CuckooError::config(format!(
            "Zip file does not exist: {}",
            zip_path.display()
        )));
    }

    let file = fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    // Check the layout before touching the CWD.
    let mut entries = Vec::new();
    let mut summary = UnpackSummary::default();
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let Some(name) = entry.enclosed_name() else {
            return Err(CuckooError::config(format!(
                "Zip entry '{}' has an unsafe path",
                entry.name()
            )));
        };

        let Some(component) = component_of(&name) else {
            tracing::debug!("Ignoring zip entry {}", name.display());
            continue;
        };
        if !entry.is_dir() {
            match component {
                "monitor" => summary.monitor_files += 1,
                _ => summary.stager_files += 1,
            }
        }
        entries.push((index, name));
    }

    if summary.monitor_files == 0 || summary.stager_files == 0 {
        return Err(CuckooError::config(format!(
            "{} does not contain both monitor and stager components",
            zip_path.display()
        )));
    }

    // Extract next to the live directories so a failure leaves them untouched.
    let staging = tempfile::Builder::new()
        .prefix(".unpack-")
        .tempdir_in(cwd.root())?;

    for (index, name) in entries {
        let mut entry = archive.by_index(index)?;
        let destination = staging.path().join(&name);

        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = fs::File::create(&destination)?;
        io::copy(&mut entry, &mut output)?;
        set_mode(&destination, entry.unix_mode())?;
    }

    for component in COMPONENTS {
        swap_in(&staging.path().join(component), &cwd.root().join(component), staging.path())?;
    }

    tracing::info!(
        "Unpacked {} monitor and {} stager files from {}",
        summary.monitor_files,
        summary.stager_files,
        zip_path.display()
    );
    Ok(summary)
}

/// Moves `fresh` to `live`. The previous `live` is parked in `staging` and put
/// back if the move fails.
fn swap_in(fresh: &Path, live: &Path, staging: &Path) -> io::Result<()> {
    let parked = staging.join(format!(
        "previous-{}",
        live.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    ));
    let had_previous = live.exists();
    if had_previous {
        fs::rename(live, &parked)?;
    }

    if let Err(e) = fs::rename(fresh, live) {
        if had_previous {
            let _ = fs::rename(&parked, live);
        }
        return Err(e);
    }
    Ok(())
}

fn component_of(name: &Path) -> Option<&'static str> {
    match name.components().next() {
        Some(Component::Normal(first)) => COMPONENTS.into_iter().find(|c| first == *c),
        _ => None,
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}
