//! CLI commands

mod build;
mod init;
mod plan;
mod sources;

pub use build::BuildCommand;
pub use init::InitCommand;
pub use plan::PlanCommand;
