use crate::config::toml_config::SubsystemCommands;
use crate::config::AppConfig;
use crate::domain::model::{RunMode, ServerOptions};
use crate::domain::ports::Subsystem;
use crate::utils::error::{CuckooError, Result};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Web,
    Api,
}

impl Framework {
    pub fn name(&self) -> &'static str {
        match self {
            Framework::Web => "web",
            Framework::Api => "api",
        }
    }

    fn log_file(&self) -> &'static str {
        match self {
            Framework::Web => "web.log",
            Framework::Api => "api.log",
        }
    }
}

/// Token management handed to the API framework's `apitoken` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTokenAction {
    List,
    Create { owner: String, admin: bool },
    Delete(u64),
    Clear,
}

impl ApiTokenAction {
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec!["apitoken".to_string()];
        match self {
            ApiTokenAction::List => argv.push("--list".to_string()),
            ApiTokenAction::Create { owner, admin } => {
                argv.extend(["--create".to_string(), owner.clone()]);
                if *admin {
                    argv.push("--admin".to_string());
                }
            }
            ApiTokenAction::Delete(id) => argv.extend(["--delete".to_string(), id.to_string()]),
            ApiTokenAction::Clear => argv.push("--clear".to_string()),
        }
        argv
    }
}

/// Starts each subsystem as an external program configured in `conf/cuckoo.toml`.
#[derive(Debug, Clone)]
pub struct CommandSubsystem {
    config: AppConfig,
    commands: SubsystemCommands,
}

impl CommandSubsystem {
    pub fn new(config: AppConfig, commands: SubsystemCommands) -> Self {
        Self { config, commands }
    }

    pub fn argv(&self, mode: &RunMode) -> Result<Vec<String>> {
        let (template, server, log_file) = match mode {
            RunMode::Standalone => (&self.commands.standalone, None, "cuckoo.log"),
            RunMode::Distributed => (&self.commands.distributed, None, "cuckoo.log"),
            RunMode::ImportMode => (&self.commands.importmode, None, "cuckoo.log"),
            RunMode::Web(options) => (&self.commands.web, Some(options), Framework::Web.log_file()),
            RunMode::Api(options) => (&self.commands.api, Some(options), Framework::Api.log_file()),
        };
        if template.is_empty() {
            return Err(CuckooError::startup(format!(
                "No command configured for {} in [subsystems]",
                mode.name()
            )));
        }

        let mut argv = self.render(template, server, log_file);
        if server.is_some_and(|options| options.autoreload) {
            argv.push("--autoreload".to_string());
        }
        Ok(argv)
    }

    pub fn passthrough_argv(&self, framework: Framework, args: &[String]) -> Result<Vec<String>> {
        let template = match framework {
            Framework::Web => &self.commands.web_command,
            Framework::Api => &self.commands.api_command,
        };
        if template.is_empty() {
            return Err(CuckooError::startup(format!(
                "No command configured for {}_command in [subsystems]",
                framework.name()
            )));
        }

        let mut argv = self.render(template, None, framework.log_file());
        argv.extend(args.iter().cloned());
        Ok(argv)
    }

    /// Hands the arguments to the web framework's own command line and waits.
    pub fn run_passthrough(&self, framework: Framework, args: &[String]) -> Result<()> {
        let argv = self.passthrough_argv(framework, args)?;
        tracing::debug!("Running {:?}", argv);

        let status = std::process::Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .map_err(|e| CuckooError::startup(format!("Failed to launch '{}': {}", argv[0], e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(CuckooError::startup(format!(
                "{} command exited with {}",
                framework.name(),
                status
            )))
        }
    }

    fn render(
        &self,
        template: &[String],
        server: Option<&ServerOptions>,
        log_file: &str,
    ) -> Vec<String> {
        let cwd = self.config.cwd_path().display().to_string();
        let loglevel = self.config.log_level().as_str();
        let logfile = self.config.cwd().log_dir().join(log_file).display().to_string();

        template
            .iter()
            .map(|arg| {
                let mut arg = arg
                    .replace("{cwd}", &cwd)
                    .replace("{loglevel}", loglevel)
                    .replace("{logfile}", &logfile);
                if let Some(options) = server {
                    arg = arg
                        .replace("{host}", &options.host)
                        .replace("{port}", &options.port.to_string());
                }
                arg
            })
            .collect()
    }
}

#[async_trait]
impl Subsystem for CommandSubsystem {
    async fn run(&self, mode: &RunMode) -> Result<()> {
        let argv = self.argv(mode)?;
        tracing::debug!("Launching {:?}", argv);

        let mut child = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CuckooError::startup(format!("Failed to launch '{}': {}", argv[0], e)))?;

        let status = child.wait().await?;
        if status.success() {
            tracing::info!("Cuckoo {} stopped", mode.name());
            Ok(())
        } else {
            Err(CuckooError::startup(format!(
                "{} exited with {}",
                mode.name(),
                status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    fn subsystem(commands: SubsystemCommands) -> CommandSubsystem {
        CommandSubsystem::new(AppConfig::new("/srv/cwd", LogLevel::Debug), commands)
    }

    #[test]
    fn test_argv_placeholders() {
        let commands = SubsystemCommands {
            standalone: strings(&["cuckoo-core", "--cwd", "{cwd}", "--loglevel", "{loglevel}"]),
            web: strings(&["cuckoo-web", "--logfile", "{logfile}", "runserver", "{host}:{port}"]),
            ..SubsystemCommands::default()
        };
        let subsystem = subsystem(commands);

        assert_eq!(
            subsystem.argv(&RunMode::Standalone).unwrap(),
            strings(&["cuckoo-core", "--cwd", "/srv/cwd", "--loglevel", "debug"])
        );

        let web = RunMode::Web(ServerOptions {
            host: "0.0.0.0".to_string(),
            port: 8000,
            autoreload: true,
        });
        assert_eq!(
            subsystem.argv(&web).unwrap(),
            strings(&[
                "cuckoo-web",
                "--logfile",
                "/srv/cwd/log/web.log",
                "runserver",
                "0.0.0.0:8000",
                "--autoreload"
            ])
        );
    }

    #[test]
    fn test_unconfigured_mode_is_a_startup_error() {
        let subsystem = subsystem(SubsystemCommands::default());

        assert!(matches!(
            subsystem.argv(&RunMode::ImportMode),
            Err(CuckooError::StartupError { .. })
        ));
        assert!(subsystem.passthrough_argv(Framework::Api, &[]).is_err());
    }

    #[test]
    fn test_passthrough_appends_arguments() {
        let commands = SubsystemCommands {
            api_command: strings(&["cuckoo-api", "--cwd", "{cwd}"]),
            ..SubsystemCommands::default()
        };
        let argv = subsystem(commands)
            .passthrough_argv(Framework::Api, &strings(&["migrate", "--noinput"]))
            .unwrap();

        assert_eq!(argv, strings(&["cuckoo-api", "--cwd", "/srv/cwd", "migrate", "--noinput"]));
    }

    #[test]
    fn test_token_actions_use_api_command() {
        let commands = SubsystemCommands {
            api_command: strings(&["cuckoo-api", "--cwd", "{cwd}"]),
            ..SubsystemCommands::default()
        };
        let subsystem = subsystem(commands);
        let argv = |action: ApiTokenAction| {
            subsystem
                .passthrough_argv(Framework::Api, &action.argv())
                .unwrap()
        };

        assert_eq!(
            argv(ApiTokenAction::List),
            strings(&["cuckoo-api", "--cwd", "/srv/cwd", "apitoken", "--list"])
        );
        assert_eq!(
            argv(ApiTokenAction::Create {
                owner: "alice".to_string(),
                admin: true,
            }),
            strings(&["cuckoo-api", "--cwd", "/srv/cwd", "apitoken", "--create", "alice", "--admin"])
        );
        assert_eq!(
            ApiTokenAction::Create {
                owner: "bob".to_string(),
                admin: false,
            }
            .argv(),
            strings(&["apitoken", "--create", "bob"])
        );
        assert_eq!(ApiTokenAction::Delete(7).argv(), strings(&["apitoken", "--delete", "7"]));
        assert_eq!(ApiTokenAction::Clear.argv(), strings(&["apitoken", "--clear"]));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let commands = SubsystemCommands {
            importmode: strings(&["sh", "-c", "exit 0"]),
            distributed: strings(&["sh", "-c", "exit 3"]),
            ..SubsystemCommands::default()
        };
        let subsystem = subsystem(commands);

        assert!(tokio_test::block_on(subsystem.run(&RunMode::ImportMode)).is_ok());

        let err = tokio_test::block_on(subsystem.run(&RunMode::Distributed)).unwrap_err();
        assert!(err.to_string().contains("distributed exited with"));
    }
}
