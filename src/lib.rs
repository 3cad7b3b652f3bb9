pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig, LogFormat};

pub use app::pipelines::ArxmlPipeline;
pub use config::toml_config::{JobConfig, ViewerConfig};
pub use core::{engine::ViewerEngine, parser::ArxmlParser};
pub use domain::model::ArxmlModel;
pub use utils::error::{Result, ViewerError};
