use crate::domain::ports::{AnalysisResult, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through open (extract + transform) and export (load).
pub struct ViewerEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ViewerEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    pub async fn open(&self) -> Result<AnalysisResult> {
        self.monitor.log_stats("Start");

        tracing::info!("🔍 Reading input...");
        let source = self.pipeline.extract().await?;
        tracing::info!("Read {} ({} bytes)", source.path, source.content.len());
        self.monitor.log_stats("Extract");

        tracing::info!("Parsing and laying out...");
        let result = self.pipeline.transform(source).await?;
        let stats = result.model.statistics();
        tracing::info!(
            "Analyzed {} packages, {} components, {} interfaces, {} connections",
            stats.packages_parsed,
            stats.components_parsed,
            stats.interfaces_parsed,
            stats.connections_parsed
        );
        self.monitor.log_stats("Transform");

        Ok(result)
    }

    pub async fn export(&self, result: &AnalysisResult) -> Result<String> {
        tracing::info!("Exporting...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("✅ Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        Ok(output_path)
    }

    pub async fn run(&self) -> Result<String> {
        let result = self.open().await?;
        let output_path = self.export(&result).await?;
        self.monitor.log_final_stats();
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{LayoutResult, LayoutType};
    use crate::domain::model::ArxmlModel;
    use crate::domain::ports::SourceDocument;
    use crate::utils::error::ViewerError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubPipeline {
        missing_input: bool,
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<SourceDocument> {
            if self.missing_input {
                return Err(ViewerError::FileNotFound {
                    path: "stub.arxml".to_string(),
                });
            }
            Ok(SourceDocument {
                path: "stub.arxml".to_string(),
                content: b"<AUTOSAR/>".to_vec(),
            })
        }

        async fn transform(&self, source: SourceDocument) -> Result<AnalysisResult> {
            let mut model = ArxmlModel::default();
            model.metadata.file_path = source.path;
            Ok(AnalysisResult {
                model,
                layout: LayoutResult::empty(LayoutType::Grid),
            })
        }

        async fn load(&self, _result: &AnalysisResult) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok("out/arxml_export.zip".to_string())
        }
    }

    #[test]
    fn test_run_opens_then_exports() {
        let engine = ViewerEngine::new(StubPipeline::default());

        let output = tokio_test::block_on(engine.run()).unwrap();
        assert_eq!(output, "out/arxml_export.zip");
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 1);
        assert!(!engine.monitor().is_enabled());
    }

    #[test]
    fn test_open_does_not_export() {
        let engine = ViewerEngine::new(StubPipeline::default());

        let result = tokio_test::block_on(engine.open()).unwrap();
        assert_eq!(result.model.metadata.file_path, "stub.arxml");
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_extract_failure_stops_the_run() {
        let engine = ViewerEngine::new(StubPipeline {
            missing_input: true,
            ..StubPipeline::default()
        });

        let err = tokio_test::block_on(engine.run()).unwrap_err();
        assert!(matches!(err, ViewerError::FileNotFound { .. }));
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }
}
