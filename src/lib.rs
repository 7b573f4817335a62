pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, job::ExportJob, jobs_config::JobsConfig, Target};
pub use core::{engine::ExportEngine, pipeline::ExportPipeline};
pub use domain::model::{PdlSource, Protocol, ProtocolDocument};
pub use utils::error::{ExportError, Result};
