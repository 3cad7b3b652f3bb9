use crate::core::layout::{LayoutParameters, LayoutResult, LayoutType};
use crate::core::parser::ParserOptions;
use crate::domain::model::ArxmlModel;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    /// Lowercase format names, currently `json` and `csv`.
    fn export_formats(&self) -> &[String];
    /// `Some(name)` bundles the export into one ZIP file.
    fn archive_name(&self) -> Option<&str>;
    fn parser_options(&self) -> ParserOptions;
    /// `None` lets the engine pick a layout from the model shape.
    fn layout_type(&self) -> Option<LayoutType>;
    fn layout_parameters(&self) -> &LayoutParameters;
}

/// Raw input as read from storage.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub model: ArxmlModel,
    pub layout: LayoutResult,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceDocument>;
    async fn transform(&self, source: SourceDocument) -> Result<AnalysisResult>;
    async fn load(&self, result: &AnalysisResult) -> Result<String>;
}
