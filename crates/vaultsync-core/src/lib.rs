//! vaultsync core - Shared functionality for the vaultsync tools
//!
//! Fixed on-disk layout of an umbrella repository, the blocking runner
//! used for every external tool invocation, and configuration loading.

pub mod config;
pub mod paths;
pub mod process;

pub use config::Config;
pub use paths::Layout;
pub use process::{ToolCommand, ToolOutput};
