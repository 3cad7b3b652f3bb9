pub mod arxml_pipeline;

pub use arxml_pipeline::{build_export_files, create_archive, ArxmlPipeline, ExportFile};
