#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::{CliConfig, LogFormat};

#[cfg(feature = "cli")]
mod cli_args {
    use super::toml_config::ViewerConfig;
    use crate::core::layout::LayoutType;
    use crate::core::search::{SearchMode, SearchScope};
    use clap::Parser;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
    pub enum LogFormat {
        #[default]
        Text,
        Json,
    }

    #[derive(Debug, Clone, Parser)]
    #[command(name = "arxml-viewer")]
    #[command(about = "Inspect AUTOSAR ARXML files: structure, search, filters, layout and export")]
    pub struct CliConfig {
        /// ARXML file to open
        #[arg(value_name = "FILE")]
        pub file: Option<String>,

        #[arg(long, help = "Enable debug logging")]
        pub debug: bool,

        #[arg(long, help = "Configuration file (defaults to the platform config path)")]
        pub config: Option<String>,

        #[arg(long, help = "Search query")]
        pub search: Option<String>,

        #[arg(long, value_enum)]
        pub scope: Option<SearchScope>,

        #[arg(long, value_enum)]
        pub mode: Option<SearchMode>,

        #[arg(long)]
        pub max_results: Option<usize>,

        #[arg(long, help = "Case sensitive search")]
        pub case_sensitive: bool,

        /// Quick filter name or an expression like `name=Speed`, `component_type==...`, `package~=^/Body`
        #[arg(long)]
        pub filter: Vec<String>,

        #[arg(long, value_enum)]
        pub layout: Option<LayoutType>,

        #[arg(long, help = "Print the package tree")]
        pub tree: bool,

        #[arg(long, help = "Print interface documentation")]
        pub interfaces: bool,

        #[arg(long, help = "Navigate to a package path and print its breadcrumb")]
        pub goto: Option<String>,

        #[arg(long, help = "Write the export into this directory")]
        pub export: Option<String>,

        #[arg(long, help = "Enable CPU and memory monitoring")]
        pub monitor: bool,

        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        pub log_format: LogFormat,
    }

    impl CliConfig {
        /// CLI 參數優先於設定檔
        pub fn apply_overrides(&self, config: &mut ViewerConfig) {
            if let Some(scope) = self.scope {
                config.search.default_scope = scope;
            }
            if let Some(mode) = self.mode {
                config.search.default_mode = mode;
            }
            if let Some(max_results) = self.max_results {
                config.search.max_results = max_results;
            }
            if self.case_sensitive {
                config.search.case_sensitive = true;
            }
            if let Some(layout) = self.layout {
                config.layout.default_type = Some(layout);
            }
            if let Some(export) = &self.export {
                config.export.output_path = export.clone();
            }
            if self.monitor {
                config.monitoring.enabled = true;
            }
            if self.log_format == LogFormat::Json {
                config.monitoring.json_logs = true;
            }
        }
    }

}
