//! Default configuration files written into a new working directory.

/// (path relative to the CWD, contents)
pub const CONFIG_TEMPLATES: &[(&str, &str)] = &[
    ("conf/cuckoo.toml", CUCKOO_TOML),
    ("conf/analysissettings.toml", ANALYSIS_SETTINGS_TOML),
    ("conf/machineries/qemu.toml", QEMU_TOML),
    ("conf/machineries/kvm.toml", KVM_TOML),
];

const CUCKOO_TOML: &str = r#"# Cuckoo main configuration.
# Values written as ${VAR} are replaced with the environment variable VAR.

[state_controller]
# UNIX socket the state controller listens on. Relative paths are resolved
# against the working directory.
socket = "operational/sockets/statecontroller.sock"

[subsystems]
# Programs started by 'cuckoo', 'cuckoo --distributed', 'cuckoo start-import-mode',
# 'cuckoo start-web' and 'cuckoo start-api'.
# Placeholders: {cwd} {loglevel} {logfile} {host} {port}
standalone = ["cuckoo-core", "--cwd", "{cwd}", "--loglevel", "{loglevel}"]
distributed = ["cuckoo-core", "--cwd", "{cwd}", "--loglevel", "{loglevel}", "--controller"]
importmode = ["cuckoo-core", "--cwd", "{cwd}", "--loglevel", "{loglevel}", "--import-mode"]
web = ["cuckoo-web", "--cwd", "{cwd}", "--logfile", "{logfile}", "runserver", "{host}:{port}"]
api = ["cuckoo-api", "--cwd", "{cwd}", "--logfile", "{logfile}", "runserver", "{host}:{port}"]

# Prefixes for 'cuckoo start-web djangocommand ...' and 'cuckoo start-api djangocommand ...'
web_command = ["cuckoo-web", "--cwd", "{cwd}"]
api_command = ["cuckoo-api", "--cwd", "{cwd}"]
"#;

const ANALYSIS_SETTINGS_TOML: &str = r#"# Limits applied to submitted analysis settings.

[limits]
# Maximum analysis timeout in seconds.
max_timeout = 300
max_priority = 999
# Maximum number of platforms a single submission may target.
max_platforms = 3
"#;

const QEMU_TOML: &str = r#"# QEMU machinery. Add machines with:
# cuckoo machine add qemu <name> <label> <ip> <platform>

[machines]
"#;

const KVM_TOML: &str = r#"# KVM machinery. Add machines with:
# cuckoo machine add kvm <name> <label> <ip> <platform>

[machines]
"#;
