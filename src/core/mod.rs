pub mod engine;
pub mod filter;
pub mod interface_parser;
pub mod layout;
pub mod navigation;
pub mod parser;
pub mod search;
pub mod xml;

pub use crate::domain::model::ArxmlModel;
pub use crate::domain::ports::{AnalysisResult, ConfigProvider, Pipeline, SourceDocument, Storage};
pub use crate::utils::error::Result;
