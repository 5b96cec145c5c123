// Adapters layer: concrete implementations of the domain ports.

pub mod api;
pub mod local;
pub mod process;

pub use api::ApiSubmitter;
pub use local::LocalSubmitter;
pub use process::{ApiTokenAction, CommandSubsystem, Framework};
