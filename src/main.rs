use clap::Parser;
use cuckoo_cli::adapters::{ApiTokenAction, Framework};
use cuckoo_cli::app::commands::{self, ApiTarget, SubmitRequest, DEFAULT_API_PORT, DEFAULT_WEB_PORT};
use cuckoo_cli::config::cli::{
    ApiCommand, Cli, Command, MachineCommand, ServerArgs, TokenArgs, WebCommand,
};
use cuckoo_cli::config::default_cwd_path;
use cuckoo_cli::core::machinery::{parse_tags, MachineSpec};
use cuckoo_cli::domain::model::{RunMode, ServerOptions, TargetKind};
use cuckoo_cli::utils::logger;
use cuckoo_cli::{AppConfig, LogLevel, Result};

fn main() {
    let cli = Cli::parse();

    let log_level = LogLevel::from_flags(cli.verbose, cli.debug, cli.quiet);
    logger::init_cli_logger(log_level);
    tracing::debug!("CLI arguments: {:?}", cli);

    let config = match cli.cwd.clone() {
        Some(path) => Ok(AppConfig::new(path, log_level)),
        None => default_cwd_path().map(|path| AppConfig::new(path, log_level)),
    };

    if let Err(e) = config.and_then(|config| run(cli, config)) {
        tracing::debug!(
            "Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli, config: AppConfig) -> Result<()> {
    // Every command except creating the CWD needs a valid one.
    if !matches!(cli.command, Some(Command::CreateWorkingDirectory { .. })) {
        config.cwd().require_valid()?;
    }

    match cli.command {
        None => {
            let mode = if cli.distributed {
                RunMode::Distributed
            } else {
                RunMode::Standalone
            };
            commands::start(config, mode)
        }
        Some(Command::CreateWorkingDirectory {
            regen_configs,
            create_missing_directories,
        }) => commands::create_working_directory(&config, regen_configs, create_missing_directories)
            .map(|_| ()),
        Some(Command::UnpackMonitor { zip_path }) => commands::unpack_monitor(&config, &zip_path),
        Some(Command::Machine {
            command:
                MachineCommand::Add {
                    machinery,
                    name,
                    label,
                    ip,
                    platform,
                    os_version,
                    snapshot,
                    interface,
                    tags,
                },
        }) => {
            let machine = MachineSpec {
                name,
                label,
                ip,
                platform,
                os_version,
                snapshot,
                interface,
                tags: parse_tags(&tags),
            };
            commands::add_machine(&config, &machinery, &machine)
        }
        Some(Command::Submit(args)) => {
            let api = match (args.api_url, args.api_key) {
                (Some(url), Some(key)) => Some(ApiTarget { url, key }),
                _ => None,
            };
            let request = SubmitRequest {
                kind: if args.url {
                    TargetKind::Url
                } else {
                    TargetKind::File
                },
                targets: args.targets,
                platforms: args.platforms,
                timeout: args.timeout,
                priority: args.priority,
                api,
            };
            commands::submit(&config, request).map(|_| ())
        }
        Some(Command::StartWeb(args)) => match args.command {
            Some(WebCommand::Passthrough { args }) => {
                commands::framework_command(&config, Framework::Web, &args)
            }
            None => serve(config, Framework::Web, args.server),
        },
        Some(Command::StartApi(args)) => match args.command {
            Some(ApiCommand::Passthrough { args }) => {
                commands::framework_command(&config, Framework::Api, &args)
            }
            Some(ApiCommand::Token(token)) => {
                let assume_yes = token.yes;
                commands::api_token(&config, token_action(token), assume_yes)
            }
            None => serve(config, Framework::Api, args.server),
        },
        Some(Command::StartImportMode) => commands::start(config, RunMode::ImportMode),
    }
}

fn token_action(token: TokenArgs) -> ApiTokenAction {
    if let Some(owner) = token.create {
        ApiTokenAction::Create {
            owner,
            admin: token.admin,
        }
    } else if let Some(id) = token.delete {
        ApiTokenAction::Delete(id)
    } else if token.clear {
        ApiTokenAction::Clear
    } else {
        ApiTokenAction::List
    }
}

fn serve(config: AppConfig, framework: Framework, args: ServerArgs) -> Result<()> {
    let default_port = match framework {
        Framework::Web => DEFAULT_WEB_PORT,
        Framework::Api => DEFAULT_API_PORT,
    };
    let options = ServerOptions {
        host: args.host,
        port: args.port.unwrap_or(default_port),
        autoreload: args.autoreload,
    };
    let mode = match framework {
        Framework::Web => RunMode::Web(options),
        Framework::Api => RunMode::Api(options),
    };
    commands::start(config, mode)
}
