pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CommandLineRequestParser, HttpBackend, ProcessBackend};
pub use config::{Configuration, ConfigurationBuilder};
pub use core::{dispatcher::FaxClient, registry::BackendRegistry};
pub use domain::model::{Capabilities, FaxActionType, FaxJob, FaxJobPriority, FaxJobStatus, FileInfo};
pub use utils::error::{FaxError, Result};
