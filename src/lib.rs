pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{AppConfig, LogLevel};
pub use core::cwd::WorkingDirectory;
pub use core::dispatcher::{SubmissionDispatcher, Submissions};
pub use core::settings::SettingsBuilder;
pub use core::startup::StartupOrchestrator;
pub use utils::error::{CuckooError, Result};
