use crate::core::layout::{detect_best_layout, LayoutEngine};
use crate::core::parser::ArxmlParser;
use crate::core::{AnalysisResult, ConfigProvider, Pipeline, SourceDocument, Storage};
use crate::domain::model::{ArxmlModel, ConnectionEndpoint};
use crate::utils::error::{Result, ViewerError};
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One named export artifact (`model.json`, `components.csv`, ...).
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub name: String,
    pub content: Vec<u8>,
}

pub struct ArxmlPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> ArxmlPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ArxmlPipeline<S, C> {
    async fn extract(&self) -> Result<SourceDocument> {
        let path = self.config.input_path();
        tracing::debug!("Reading ARXML input: {}", path);

        let content = self.storage.read_file(path).await?;

        let limit_mb = self.config.parser_options().max_file_size_mb;
        let size_mb = content.len() as f64 / BYTES_PER_MB;
        if size_mb > limit_mb as f64 {
            return Err(ViewerError::FileTooLarge {
                path: path.to_string(),
                size_mb,
                limit_mb,
            });
        }

        Ok(SourceDocument {
            path: path.to_string(),
            content,
        })
    }

    async fn transform(&self, source: SourceDocument) -> Result<AnalysisResult> {
        let mut parser = ArxmlParser::new(self.config.parser_options());
        let model = parser.parse_bytes(&source.content, &source.path)?;

        let components = model.all_components();
        let layout_type = self
            .config
            .layout_type()
            .unwrap_or_else(|| detect_best_layout(components.len(), model.connections.len()));
        tracing::debug!(
            "Laying out {} components with {} layout",
            components.len(),
            layout_type
        );

        let engine = LayoutEngine::new(self.config.layout_parameters().clone());
        let layout = engine.apply_layout(&components, &model.connections, layout_type);

        Ok(AnalysisResult { model, layout })
    }

    async fn load(&self, result: &AnalysisResult) -> Result<String> {
        let files = build_export_files(result, self.config.export_formats())?;
        if files.is_empty() {
            tracing::warn!("⚠️ No export format selected, nothing written");
            return Ok(self.config.output_path().to_string());
        }

        match self.config.archive_name() {
            Some(archive_name) => {
                tracing::debug!("Creating ZIP file with {} files", files.len());
                let zip_data = create_archive(&files)?;

                let output_path = self.output_file(archive_name);
                tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
                self.storage.write_file(&output_path, &zip_data).await?;
                Ok(output_path)
            }
            None => {
                for file in &files {
                    let output_path = self.output_file(&file.name);
                    tracing::debug!("Writing {} ({} bytes)", output_path, file.content.len());
                    self.storage.write_file(&output_path, &file.content).await?;
                }
                Ok(self.config.output_path().to_string())
            }
        }
    }
}

/// 依照格式產生匯出檔案內容，未知格式略過
pub fn build_export_files(result: &AnalysisResult, formats: &[String]) -> Result<Vec<ExportFile>> {
    let mut files = Vec::new();

    for format in formats {
        match format.to_ascii_lowercase().as_str() {
            "json" => {
                files.push(ExportFile {
                    name: "model.json".to_string(),
                    content: serde_json::to_vec_pretty(&result.model)?,
                });
                files.push(ExportFile {
                    name: "layout.json".to_string(),
                    content: serde_json::to_vec_pretty(&result.layout)?,
                });
            }
            "csv" => {
                files.push(ExportFile {
                    name: "components.csv".to_string(),
                    content: components_csv(&result.model)?,
                });
                files.push(ExportFile {
                    name: "ports.csv".to_string(),
                    content: ports_csv(&result.model)?,
                });
                files.push(ExportFile {
                    name: "connections.csv".to_string(),
                    content: connections_csv(&result.model)?,
                });
                files.push(ExportFile {
                    name: "interfaces.csv".to_string(),
                    content: interfaces_csv(&result.model)?,
                });
            }
            other => tracing::warn!("Unsupported export format '{}' skipped", other),
        }
    }

    Ok(files)
}

pub fn create_archive(files: &[ExportFile]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for file in files {
        zip.start_file::<_, ()>(file.name.as_str(), FileOptions::default())?;
        zip.write_all(&file.content)?;
    }

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ViewerError::IoError(e.into_error()))
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn components_csv(model: &ArxmlModel) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "uuid",
        "short_name",
        "component_type",
        "package_path",
        "provided_ports",
        "required_ports",
        "connections",
        "description",
    ])?;

    for component in model.all_components() {
        writer.write_record([
            component.uuid.as_str(),
            component.short_name.as_str(),
            component.component_type.tag(),
            opt(&component.package_path),
            &component.provided_ports.len().to_string(),
            &component.required_ports.len().to_string(),
            &model.connections_for_component(&component.uuid).len().to_string(),
            opt(&component.desc),
        ])?;
    }

    finish_csv(writer)
}

fn ports_csv(model: &ArxmlModel) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "uuid",
        "short_name",
        "port_type",
        "component",
        "interface_ref",
        "interface",
    ])?;

    for component in model.all_components() {
        for port in component.all_ports() {
            let interface = port
                .interface_uuid
                .as_deref()
                .and_then(|uuid| model.interface(uuid))
                .map(|i| i.short_name.as_str())
                .unwrap_or("");
            writer.write_record([
                port.uuid.as_str(),
                port.short_name.as_str(),
                port.port_type.tag(),
                component.short_name.as_str(),
                opt(&port.interface_ref),
                interface,
            ])?;
        }
    }

    finish_csv(writer)
}

fn endpoint_names(model: &ArxmlModel, endpoint: &ConnectionEndpoint) -> (String, String) {
    let component = endpoint
        .component_uuid
        .as_deref()
        .and_then(|uuid| model.find_component(uuid))
        .map(|c| c.short_name.clone())
        .unwrap_or_else(|| opt(&endpoint.component_ref).to_string());
    let port = endpoint
        .port_uuid
        .as_deref()
        .and_then(|uuid| model.find_port(uuid))
        .map(|(_, p)| p.short_name.clone())
        .unwrap_or_else(|| opt(&endpoint.port_ref).to_string());
    (component, port)
}

fn connections_csv(model: &ArxmlModel) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "uuid",
        "short_name",
        "connection_type",
        "provider_component",
        "provider_port",
        "requester_component",
        "requester_port",
        "resolved",
    ])?;

    for connection in &model.connections {
        let (provider_component, provider_port) = endpoint_names(model, &connection.provider);
        let (requester_component, requester_port) = endpoint_names(model, &connection.requester);
        writer.write_record([
            connection.uuid.as_str(),
            connection.short_name.as_str(),
            connection.connection_type.tag(),
            &provider_component,
            &provider_port,
            &requester_component,
            &requester_port,
            if connection.is_resolved() { "true" } else { "false" },
        ])?;
    }

    finish_csv(writer)
}

fn interfaces_csv(model: &ArxmlModel) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "uuid",
        "short_name",
        "interface_type",
        "package_path",
        "methods",
        "data_elements",
        "complexity",
    ])?;

    for interface in &model.interfaces {
        writer.write_record([
            interface.uuid.as_str(),
            interface.short_name.as_str(),
            interface.interface_type.tag(),
            opt(&interface.package_path),
            &interface.method_count().to_string(),
            &interface.data_element_count().to_string(),
            &format!("{:.2}", interface.complexity_score()),
        ])?;
    }

    finish_csv(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::{LayoutParameters, LayoutType};
    use crate::core::parser::ParserOptions;
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR xmlns="http://autosar.org/schema/r4.0">
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>Demo</SHORT-NAME>
      <ELEMENTS>
        <SENDER-RECEIVER-INTERFACE>
          <SHORT-NAME>SpeedIf</SHORT-NAME>
          <DATA-ELEMENTS>
            <VARIABLE-DATA-PROTOTYPE>
              <SHORT-NAME>Speed</SHORT-NAME>
              <TYPE-TREF DEST="IMPLEMENTATION-DATA-TYPE">/Types/uint16</TYPE-TREF>
            </VARIABLE-DATA-PROTOTYPE>
          </DATA-ELEMENTS>
        </SENDER-RECEIVER-INTERFACE>
        <APPLICATION-SW-COMPONENT-TYPE>
          <SHORT-NAME>SpeedSensor</SHORT-NAME>
          <PORTS>
            <P-PORT-PROTOTYPE>
              <SHORT-NAME>SpeedOut</SHORT-NAME>
              <PROVIDED-INTERFACE-TREF DEST="SENDER-RECEIVER-INTERFACE">/Demo/SpeedIf</PROVIDED-INTERFACE-TREF>
            </P-PORT-PROTOTYPE>
          </PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| ViewerError::FileNotFound {
                path: path.to_string(),
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        input_path: String,
        output_path: String,
        export_formats: Vec<String>,
        archive_name: Option<String>,
        max_file_size_mb: u64,
        layout_type: Option<LayoutType>,
        layout_parameters: LayoutParameters,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                input_path: "demo.arxml".to_string(),
                output_path: "out".to_string(),
                export_formats: vec!["json".to_string(), "csv".to_string()],
                archive_name: Some("export.zip".to_string()),
                max_file_size_mb: 10,
                layout_type: None,
                layout_parameters: LayoutParameters::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            &self.input_path
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn export_formats(&self) -> &[String] {
            &self.export_formats
        }

        fn archive_name(&self) -> Option<&str> {
            self.archive_name.as_deref()
        }

        fn parser_options(&self) -> ParserOptions {
            ParserOptions {
                max_file_size_mb: self.max_file_size_mb,
                ..ParserOptions::default()
            }
        }

        fn layout_type(&self) -> Option<LayoutType> {
            self.layout_type
        }

        fn layout_parameters(&self) -> &LayoutParameters {
            &self.layout_parameters
        }
    }

    async fn pipeline(config: MockConfig) -> (ArxmlPipeline<MockStorage, MockConfig>, MockStorage) {
        let storage = MockStorage::new();
        storage.put_file("demo.arxml", DOCUMENT.as_bytes()).await;
        (ArxmlPipeline::new(storage.clone(), config), storage)
    }

    #[tokio::test]
    async fn test_extract_and_transform() {
        let (pipeline, _) = pipeline(MockConfig::new()).await;

        let source = pipeline.extract().await.unwrap();
        assert_eq!(source.path, "demo.arxml");

        let result = pipeline.transform(source).await.unwrap();
        assert_eq!(result.model.all_components().len(), 1);
        assert_eq!(result.model.interfaces.len(), 1);
        assert_eq!(result.layout.layout_type, LayoutType::Grid);
        assert_eq!(result.layout.positions.len(), 1);
    }

    #[tokio::test]
    async fn test_configured_layout_is_used() {
        let mut config = MockConfig::new();
        config.layout_type = Some(LayoutType::Circular);
        let (pipeline, _) = pipeline(config).await;

        let source = pipeline.extract().await.unwrap();
        let result = pipeline.transform(source).await.unwrap();
        assert_eq!(result.layout.layout_type, LayoutType::Circular);
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let mut config = MockConfig::new();
        config.input_path = "missing.arxml".to_string();
        let (pipeline, _) = pipeline(config).await;

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ViewerError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_extract_enforces_size_limit() {
        let mut config = MockConfig::new();
        config.max_file_size_mb = 0;
        let (pipeline, _) = pipeline(config).await;

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ViewerError::FileTooLarge { limit_mb: 0, .. }));
    }

    #[tokio::test]
    async fn test_load_writes_archive() {
        let (pipeline, storage) = pipeline(MockConfig::new()).await;

        let source = pipeline.extract().await.unwrap();
        let result = pipeline.transform(source).await.unwrap();
        let output_path = pipeline.load(&result).await.unwrap();
        assert!(output_path.ends_with("export.zip"));

        let zip_data = storage.get_file(&output_path).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 6);

        let mut components = String::new();
        archive
            .by_name("components.csv")
            .unwrap()
            .read_to_string(&mut components)
            .unwrap();
        assert!(components.starts_with("uuid,short_name,component_type"));
        assert!(components.contains("SpeedSensor,APPLICATION-SW-COMPONENT-TYPE,/Demo"));

        let mut ports = String::new();
        archive
            .by_name("ports.csv")
            .unwrap()
            .read_to_string(&mut ports)
            .unwrap();
        assert!(ports.contains("SpeedOut,P-PORT-PROTOTYPE,SpeedSensor,/Demo/SpeedIf,SpeedIf"));
    }

    #[tokio::test]
    async fn test_load_writes_individual_files() {
        let mut config = MockConfig::new();
        config.archive_name = None;
        config.export_formats = vec!["json".to_string()];
        let (pipeline, storage) = pipeline(config).await;

        let source = pipeline.extract().await.unwrap();
        let result = pipeline.transform(source).await.unwrap();
        let output_path = pipeline.load(&result).await.unwrap();
        assert_eq!(output_path, "out");

        let model_json = storage.get_file("out/model.json").await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&model_json).unwrap();
        assert_eq!(value["packages"][0]["short_name"], "Demo");
        assert!(storage.get_file("out/layout.json").await.is_some());
        assert!(storage.get_file("out/components.csv").await.is_none());
    }

    #[test]
    fn test_unknown_format_is_skipped() {
        let result = AnalysisResult {
            model: ArxmlModel::default(),
            layout: crate::core::layout::LayoutResult::empty(LayoutType::Grid),
        };
        let files = build_export_files(&result, &["xlsx".to_string()]).unwrap();
        assert!(files.is_empty());
    }
}
