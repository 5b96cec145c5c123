pub mod cwd;
pub mod dispatcher;
pub mod guest;
pub mod machinery;
pub mod settings;
pub mod startup;
pub mod templates;

pub use crate::domain::model::{RunMode, Settings, SubmissionResult, TargetKind};
pub use crate::domain::ports::{SubmissionBackend, Subsystem};
pub use crate::utils::error::Result;
