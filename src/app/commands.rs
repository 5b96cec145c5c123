//! One function per CLI command. Each takes the process `AppConfig`
//! explicitly and returns the first fatal error.

use crate::adapters::{ApiSubmitter, ApiTokenAction, CommandSubsystem, Framework, LocalSubmitter};
use crate::config::toml_config::{AnalysisSettingsConfig, CuckooConfig};
use crate::config::AppConfig;
use crate::core::cwd::{self, CwdAction};
use crate::core::dispatcher::SubmissionDispatcher;
use crate::core::guest;
use crate::core::machinery::{self, MachineSpec};
use crate::core::settings::SettingsBuilder;
use crate::core::startup::StartupOrchestrator;
use crate::domain::model::{RunMode, SubmissionOutcome, SubmissionResult, TargetKind};
use crate::domain::ports::SubmissionBackend;
use crate::utils::error::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub const DEFAULT_WEB_PORT: u16 = 8000;
pub const DEFAULT_API_PORT: u16 = 8090;

pub fn create_working_directory(
    config: &AppConfig,
    regen_configs: bool,
    create_missing_dirs: bool,
) -> Result<CwdAction> {
    let action = cwd::create_working_directory(config.cwd(), regen_configs, create_missing_dirs)?;

    match &action {
        CwdAction::Created => {
            println!("✅ Created Cuckoo CWD at: {}", config.cwd_path().display())
        }
        CwdAction::Repaired {
            configs,
            directories,
        } => {
            if regen_configs {
                println!("✅ Re-created {} missing configuration file(s)", configs.len());
            }
            if create_missing_dirs {
                println!("✅ Created {} missing directories", directories.len());
            }
        }
    }
    Ok(action)
}

pub fn unpack_monitor(config: &AppConfig, zip_path: &Path) -> Result<()> {
    let summary = guest::unpack_monitor_components(zip_path, config.cwd())?;
    println!(
        "✅ Unpacked {} monitor and {} stager file(s) into {}",
        summary.monitor_files,
        summary.stager_files,
        config.cwd_path().display()
    );
    Ok(())
}

pub fn add_machine(config: &AppConfig, machinery: &str, machine: &MachineSpec) -> Result<()> {
    machinery::add_machine(config.cwd(), machinery, machine)?;
    println!("✅ Added machine {} to machinery {}", machine.name, machinery);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ApiTarget {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub kind: TargetKind,
    pub targets: Vec<String>,
    pub platforms: Vec<String>,
    pub timeout: u64,
    pub priority: u32,
    pub api: Option<ApiTarget>,
}

#[derive(Debug, Default)]
pub struct SubmitSummary {
    pub results: Vec<SubmissionResult>,
    pub notify_warning: Option<String>,
}

impl SubmitSummary {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

/// Builds the settings, then submits every target. Per-target failures are
/// printed and collected, never returned as an error.
pub fn submit(config: &AppConfig, request: SubmitRequest) -> Result<SubmitSummary> {
    let limits = AnalysisSettingsConfig::load(config.cwd())?.limits;

    let mut builder = SettingsBuilder::new(limits);
    builder
        .timeout(request.timeout)
        .priority(request.priority)
        .manual(false);
    for token in &request.platforms {
        builder.add_platform_token(token);
    }
    // A remote API server checks platforms against its own machines.
    if request.api.is_none() {
        builder.available_platforms(machinery::configured_platforms(config.cwd())?);
    }
    let settings = builder.build()?;

    let backend: Box<dyn SubmissionBackend> = match &request.api {
        Some(api) => Box::new(ApiSubmitter::new(&api.url, &api.key)?),
        None => {
            let cuckoo_config = CuckooConfig::load(config.cwd())?;
            Box::new(LocalSubmitter::from_config(config.cwd(), &cuckoo_config))
        }
    };

    let dispatcher = SubmissionDispatcher::new(backend.as_ref(), &settings);
    let mut submissions = dispatcher.dispatch(request.kind, request.targets);
    let kind = submissions.kind();

    let mut summary = SubmitSummary::default();
    for result in submissions.by_ref() {
        match &result.outcome {
            SubmissionOutcome::Submitted(analysis_id) => {
                println!("Submitted {}: {} -> {}", kind, analysis_id, result.target)
            }
            SubmissionOutcome::Failed(error) => {
                eprintln!("Failed to submit {}: {}. {}", kind, result.target, error)
            }
        }
        summary.results.push(result);
    }

    if let Some(warning) = submissions.notify_warning() {
        eprintln!("⚠️  {}", warning);
        summary.notify_warning = Some(warning.to_string());
    }

    tracing::debug!(
        "Submitted {} of {} target(s)",
        summary.results.len() - summary.failed(),
        summary.results.len()
    );
    Ok(summary)
}

/// Runs one long-lived subsystem until it exits or the process is signalled.
pub fn start(config: AppConfig, mode: RunMode) -> Result<()> {
    let cuckoo_config = CuckooConfig::load(config.cwd())?;
    let subsystem = CommandSubsystem::new(config.clone(), cuckoo_config.subsystems);

    let stop_message = match mode {
        RunMode::ImportMode => "Stopping import mode..",
        _ => "Stopping Cuckoo..",
    };

    let mut orchestrator = StartupOrchestrator::new(config);
    orchestrator.register_shutdown("stop-message", 1, move || println!("{}", stop_message));
    orchestrator.run(mode, &subsystem)
}

pub fn framework_command(config: &AppConfig, framework: Framework, args: &[String]) -> Result<()> {
    let cuckoo_config = CuckooConfig::load(config.cwd())?;
    CommandSubsystem::new(config.clone(), cuckoo_config.subsystems).run_passthrough(framework, args)
}

/// Runs a token action through the API framework command. `--clear` asks on
/// stdin unless `assume_yes` is set.
pub fn api_token(config: &AppConfig, action: ApiTokenAction, assume_yes: bool) -> Result<()> {
    api_token_with_input(config, action, assume_yes, &mut io::stdin().lock())
}

fn api_token_with_input(
    config: &AppConfig,
    action: ApiTokenAction,
    assume_yes: bool,
    input: &mut impl BufRead,
) -> Result<()> {
    if action == ApiTokenAction::Clear
        && !assume_yes
        && !confirm("Delete all API tokens?", input)?
    {
        println!("Aborted, no tokens were deleted");
        return Ok(());
    }
    framework_command(config, Framework::Api, &action.argv())
}

/// Anything other than `y` or `yes` is a no, end of input included.
fn confirm(prompt: &str, input: &mut impl BufRead) -> io::Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm_accepts_only_yes() {
        for (input, expected) in [
            ("y\n", true),
            ("YES\n", true),
            (" yes \n", true),
            ("n\n", false),
            ("\n", false),
            ("", false),
            ("yep\n", false),
        ] {
            assert_eq!(
                confirm("Delete all API tokens?", &mut Cursor::new(input)).unwrap(),
                expected,
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_clear_only_runs_after_confirmation() {
        // No api_command is configured, so reaching the framework fails.
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig::new(temp.path().join("cwd"), crate::LogLevel::Info);
        config.cwd().create().unwrap();
        std::fs::write(config.cwd().conf_path("cuckoo.toml"), "").unwrap();

        let run = |assume_yes: bool, input: &str| {
            api_token_with_input(&config, ApiTokenAction::Clear, assume_yes, &mut Cursor::new(input))
        };

        assert!(run(false, "n\n").is_ok());
        assert!(run(false, "").is_ok());
        assert!(run(false, "y\n").is_err());
        assert!(run(true, "").is_err());
        assert!(api_token_with_input(&config, ApiTokenAction::List, false, &mut Cursor::new("")).is_err());
    }
}
