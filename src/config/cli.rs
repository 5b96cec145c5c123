use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cuckoo", version)]
#[command(about = "Cuckoo automated malware analysis sandbox")]
pub struct Cli {
    /// Cuckoo working directory [default: ~/.cuckoocwd]
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Start Cuckoo in distributed mode
    #[arg(long)]
    pub distributed: bool,

    /// Enable debug logging, including for non-Cuckoo modules
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only log warnings and critical messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the specified Cuckoo CWD
    #[command(name = "create-working-directory", visible_alias = "createcwd")]
    CreateWorkingDirectory {
        /// Re-create missing configuration files of an existing CWD
        #[arg(long)]
        regen_configs: bool,

        /// Create missing directories of an existing CWD
        #[arg(long, visible_alias = "update-directories")]
        create_missing_directories: bool,
    },

    /// Use the monitor and stager binaries from the given Cuckoo monitor zip file
    #[command(name = "unpack-monitor", visible_alias = "getmonitor")]
    UnpackMonitor { zip_path: PathBuf },

    /// Add machines to machinery configuration files
    Machine {
        #[command(subcommand)]
        command: MachineCommand,
    },

    /// Create new file or URL analyses
    Submit(SubmitArgs),

    /// Start the Cuckoo web interface
    #[command(name = "start-web", visible_alias = "web")]
    StartWeb(WebArgs),

    /// Start the Cuckoo web API
    #[command(name = "start-api", visible_alias = "api")]
    StartApi(ApiArgs),

    /// Start the Cuckoo import controller
    #[command(name = "start-import-mode", visible_alias = "importmode")]
    StartImportMode,
}

#[derive(Debug, Subcommand)]
pub enum MachineCommand {
    /// Add a machine to a machinery configuration file
    Add {
        machinery: String,
        name: String,
        label: String,
        ip: String,
        platform: String,

        /// The version of the platform installed on the machine
        #[arg(long)]
        os_version: Option<String>,

        /// A snapshot to use when restoring, other than the default snapshot
        #[arg(long)]
        snapshot: Option<String>,

        /// The network interface that should be used to create network dumps
        #[arg(long)]
        interface: Option<String>,

        /// A comma separated list of tags that identify what software is installed on the machine
        #[arg(long, default_value = "")]
        tags: String,
    },
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Files, directories or URLs to submit
    pub targets: Vec<String>,

    /// Submit URL(s) instead of files
    #[arg(short, long)]
    pub url: bool,

    /// Platform and optional OS version the analysis must run on, as platform,osversion or platform
    #[arg(long = "platform")]
    pub platforms: Vec<String>,

    /// Analysis timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// The priority of this analysis
    #[arg(long, default_value_t = 1)]
    pub priority: u32,

    /// Submit through a running Cuckoo API instead of the local CWD
    #[arg(long, requires = "api_key")]
    pub api_url: Option<String>,

    /// API token used with --api-url
    #[arg(long, requires = "api_url")]
    pub api_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct ServerArgs {
    /// Host to bind the development server on
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to bind the development server on [default: 8000 for web, 8090 for api]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Automatically reload modified files
    #[arg(long)]
    pub autoreload: bool,
}

#[derive(Debug, Args)]
pub struct WebArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Option<WebCommand>,
}

#[derive(Debug, Subcommand)]
pub enum WebCommand {
    /// Arguments for this command are passed to the web framework
    #[command(name = "djangocommand")]
    Passthrough {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct ApiArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Option<ApiCommand>,
}

#[derive(Debug, Subcommand)]
pub enum ApiCommand {
    /// Arguments for this command are passed to the web framework
    #[command(name = "djangocommand")]
    Passthrough {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List, create, and delete API tokens
    Token(TokenArgs),
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["list", "create", "delete", "clear"])
))]
pub struct TokenArgs {
    /// List all current API tokens and their owners
    #[arg(short, long)]
    pub list: bool,

    /// Create a new API token for a given owner name
    #[arg(short, long, value_name = "OWNER")]
    pub create: Option<String>,

    /// Grant admin privileges to the API token being created
    #[arg(long, requires = "create")]
    pub admin: bool,

    /// Delete the specified token by its token ID. No short flag, `-d` is --debug
    #[arg(long, value_name = "ID")]
    pub delete: Option<u64>,

    /// Delete all API tokens
    #[arg(long)]
    pub clear: bool,

    /// Do not ask for confirmation before --clear
    #[arg(short, long, requires = "clear")]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from([
            "cuckoo", "--cwd", "/srv/cwd", "submit", "a.exe", "b.exe", "--platform", "windows,10",
            "--platform", "linux", "--timeout", "60",
        ])
        .unwrap();

        assert_eq!(cli.cwd, Some(PathBuf::from("/srv/cwd")));
        match cli.command {
            Some(Command::Submit(args)) => {
                assert_eq!(args.targets, vec!["a.exe", "b.exe"]);
                assert_eq!(args.platforms, vec!["windows,10", "linux"]);
                assert_eq!(args.timeout, 60);
                assert_eq!(args.priority, 1);
                assert!(!args.url);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_web_passthrough() {
        let cli = Cli::try_parse_from(["cuckoo", "web", "djangocommand", "migrate", "--noinput"])
            .unwrap();

        match cli.command {
            Some(Command::StartWeb(args)) => {
                assert_eq!(args.server.port, None);
                match args.command {
                    Some(WebCommand::Passthrough { args }) => {
                        assert_eq!(args, vec!["migrate", "--noinput"])
                    }
                    None => panic!("missing passthrough"),
                }
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_api_token() {
        let cli = Cli::try_parse_from(["cuckoo", "api", "token", "--create", "alice", "--admin"])
            .unwrap();

        match cli.command {
            Some(Command::StartApi(ApiArgs {
                command: Some(ApiCommand::Token(token)),
                ..
            })) => {
                assert_eq!(token.create.as_deref(), Some("alice"));
                assert!(token.admin && !token.list && !token.clear);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_api_token_needs_exactly_one_action() {
        assert!(Cli::try_parse_from(["cuckoo", "api", "token"]).is_err());
        assert!(Cli::try_parse_from(["cuckoo", "api", "token", "--list", "--clear"]).is_err());
        assert!(Cli::try_parse_from(["cuckoo", "api", "token", "--admin"]).is_err());
        assert!(Cli::try_parse_from(["cuckoo", "api", "token", "--list", "--yes"]).is_err());
        assert!(Cli::try_parse_from(["cuckoo", "api", "token", "--clear", "-y"]).is_ok());
        assert!(Cli::try_parse_from(["cuckoo", "api", "token", "--delete", "3"]).is_ok());
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["cuckoo", "--distributed", "-q"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.distributed && cli.quiet);
    }

    #[test]
    fn test_api_url_requires_key() {
        assert!(Cli::try_parse_from(["cuckoo", "submit", "a", "--api-url", "http://x"]).is_err());
    }
}
