use crate::config::AppConfig;
use crate::core::guest::guest_components_present;
use crate::domain::model::RunMode;
use crate::domain::ports::Subsystem;
use crate::utils::error::{CuckooError, Result};

struct ShutdownAction {
    name: String,
    order: u32,
    action: Box<dyn FnOnce()>,
}

/// Runs every registered shutdown action once when dropped, lowest order
/// first. Actions with the same order run in registration order.
struct ShutdownGuard {
    actions: Vec<ShutdownAction>,
}

impl ShutdownGuard {
    fn new(mut actions: Vec<ShutdownAction>) -> Self {
        actions.sort_by_key(|a| a.order);
        Self { actions }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        for shutdown in self.actions.drain(..) {
            tracing::debug!("Running shutdown action '{}'", shutdown.name);
            (shutdown.action)();
        }
    }
}

pub struct StartupOrchestrator {
    config: AppConfig,
    shutdown: Vec<ShutdownAction>,
}

impl StartupOrchestrator {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            shutdown: Vec::new(),
        }
    }

    pub fn register_shutdown<F>(&mut self, name: &str, order: u32, action: F) -> &mut Self
    where
        F: FnOnce() + 'static,
    {
        self.shutdown.push(ShutdownAction {
            name: name.to_string(),
            order,
            action: Box::new(action),
        });
        self
    }

    pub fn check_preconditions(&self, mode: &RunMode) -> Result<()> {
        check_preconditions(&self.config, mode)
    }

    /// Runs the subsystem until it returns or the process receives SIGINT or
    /// SIGTERM. Registered shutdown actions run on every exit path.
    pub fn run<S>(self, mode: RunMode, subsystem: &S) -> Result<()>
    where
        S: Subsystem + ?Sized,
    {
        let StartupOrchestrator { config, shutdown } = self;
        let _shutdown = ShutdownGuard::new(shutdown);

        check_preconditions(&config, &mode)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CuckooError::startup(format!("Failed to create runtime: {}", e)))?;

        tracing::info!(
            "Starting Cuckoo {} with working directory {}",
            mode.name(),
            config.cwd_path().display()
        );

        runtime.block_on(async {
            tokio::select! {
                result = subsystem.run(&mode) => result,
                signal = shutdown_signal() => {
                    let signal = signal.map_err(|e| {
                        CuckooError::startup(format!("Failed to listen for signals: {}", e))
                    })?;
                    tracing::info!("Received {}, stopping {}", signal, mode.name());
                    Ok(())
                }
            }
        })
    }
}

fn check_preconditions(config: &AppConfig, mode: &RunMode) -> Result<()> {
    let cwd = config.cwd();
    cwd.require_valid()?;

    if mode.requires_guest_components() && !guest_components_present(cwd) {
        return Err(CuckooError::startup(
            "No monitor and stager binaries are present yet. Use 'cuckoo unpack-monitor \
             <zip path>' to unpack and use monitor and stagers from a Cuckoo monitor zip.",
        ));
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "SIGINT")
}
