use crate::core::layout::{LayoutParameters, LayoutType};
use crate::core::parser::ParserOptions;
use crate::core::search::{SearchMode, SearchScope};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, ViewerError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_EXPORT_FORMATS: [&str; 2] = ["json", "csv"];
pub const SUPPORTED_INPUT_EXTENSIONS: [&str; 2] = ["arxml", "xml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub parser: ParserConfig,
    pub search: SearchConfig,
    pub layout: LayoutConfig,
    pub export: ExportConfig,
    pub monitoring: MonitoringConfig,
    pub recent: RecentFilesConfig,
    pub input: InputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub max_file_size_mb: u64,
    pub resolve_references: bool,
    pub require_autosar_root: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let options = ParserOptions::default();
        Self {
            max_file_size_mb: options.max_file_size_mb,
            resolve_references: options.resolve_references,
            require_autosar_root: options.require_autosar_root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub case_sensitive: bool,
    pub default_scope: SearchScope,
    pub default_mode: SearchMode,
    pub auto_complete_min_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            case_sensitive: false,
            default_scope: SearchScope::All,
            default_mode: SearchMode::Contains,
            auto_complete_min_chars: 2,
        }
    }
}

impl SearchConfig {
    /// Suggestions are offered once the query reaches `auto_complete_min_chars`.
    pub fn wants_suggestions(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.auto_complete_min_chars
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// 未設定時依元件數與連線數自動選擇
    pub default_type: Option<LayoutType>,
    pub parameters: LayoutParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_path: String,
    pub formats: Vec<String>,
    pub archive: bool,
    pub archive_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            formats: vec!["json".to_string(), "csv".to_string()],
            archive: true,
            archive_name: "arxml_export.zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentFilesConfig {
    pub files: Vec<String>,
    pub max_recent_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_file: Option<String>,
}

impl Default for RecentFilesConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            max_recent_files: 10,
            last_opened_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// 批次報表要處理的檔案
    pub files: Vec<String>,
}

impl ViewerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ViewerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ViewerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})，未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ViewerError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// 只改寫檔案中的 [recent] 區段，其他設定與 ${VAR} 樣板照原文保留
    pub fn save_recent_files<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut table = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<toml::Table>(&content).map_err(|e| {
                ViewerError::ConfigValidationError {
                    field: "toml_parsing".to_string(),
                    message: format!("TOML parsing error: {}", e),
                }
            })?
        } else {
            toml::Table::new()
        };

        table.insert("recent".to_string(), toml::Value::try_from(&self.recent)?);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml::to_string_pretty(&table)?)?;
        tracing::debug!("Recent files saved to {}", path.display());
        Ok(())
    }

    pub fn json_logs_enabled(&self) -> bool {
        self.monitoring.json_logs
    }

    /// `%APPDATA%\ARXMLViewerPro\config.toml` on Windows, `~/.config/arxml-viewer/config.toml` elsewhere.
    pub fn default_config_path() -> Option<PathBuf> {
        if cfg!(windows) {
            std::env::var_os("APPDATA")
                .map(|dir| PathBuf::from(dir).join("ARXMLViewerPro").join("config.toml"))
        } else {
            std::env::var_os("HOME").map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("arxml-viewer")
                    .join("config.toml")
            })
        }
    }

    /// Most recent first, no duplicates, capped at `max_recent_files`.
    pub fn add_recent_file(&mut self, file_path: &str) {
        let recent = &mut self.recent;
        recent.files.retain(|f| f != file_path);
        recent.files.insert(0, file_path.to_string());
        recent.files.truncate(recent.max_recent_files.max(1));
        recent.last_opened_file = Some(file_path.to_string());
    }

    pub fn remove_recent_file(&mut self, file_path: &str) -> bool {
        let before = self.recent.files.len();
        self.recent.files.retain(|f| f != file_path);
        before != self.recent.files.len()
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_file_size_mb: self.parser.max_file_size_mb,
            resolve_references: self.parser.resolve_references,
            require_autosar_root: self.parser.require_autosar_root,
        }
    }

    /// 單一輸入檔的作業設定
    pub fn job_for(&self, input_path: &str) -> JobConfig {
        JobConfig {
            input_path: input_path.to_string(),
            output_path: self.export.output_path.clone(),
            export_formats: self
                .export
                .formats
                .iter()
                .map(|f| f.to_ascii_lowercase())
                .collect(),
            archive_name: self
                .export
                .archive
                .then(|| self.export.archive_name.clone()),
            parser_options: self.parser_options(),
            layout_type: self.layout.default_type,
            layout_parameters: self.layout.parameters.clone(),
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_positive_number(
            "parser.max_file_size_mb",
            self.parser.max_file_size_mb as usize,
            1,
        )?;
        validation::validate_range("search.max_results", self.search.max_results, 1, 10_000)?;
        validation::validate_positive_number(
            "recent.max_recent_files",
            self.recent.max_recent_files,
            1,
        )?;

        let params = &self.layout.parameters;
        validation::validate_range("layout.parameters.damping", params.damping, 0.0, 1.0)?;
        validation::validate_positive_number(
            "layout.parameters.iterations",
            params.iterations,
            1,
        )?;
        if let Some(columns) = params.grid_columns {
            validation::validate_positive_number("layout.parameters.grid_columns", columns, 1)?;
        }

        validation::validate_path("export.output_path", &self.export.output_path)?;
        for format in &self.export.formats {
            validation::validate_one_of("export.formats", format, &SUPPORTED_EXPORT_FORMATS)?;
        }
        if self.export.archive {
            validation::validate_non_empty_string("export.archive_name", &self.export.archive_name)?;
        }

        validation::validate_file_extensions(
            "input.files",
            &self.input.files,
            &SUPPORTED_INPUT_EXTENSIONS,
        )?;

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for ViewerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// Everything one pipeline run needs, resolved from `ViewerConfig` and CLI overrides.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: String,
    pub output_path: String,
    pub export_formats: Vec<String>,
    pub archive_name: Option<String>,
    pub parser_options: ParserOptions,
    pub layout_type: Option<LayoutType>,
    pub layout_parameters: LayoutParameters,
}

impl ConfigProvider for JobConfig {
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
        self.parser_options.clone()
    }

    fn layout_type(&self) -> Option<LayoutType> {
        self.layout_type
    }

    fn layout_parameters(&self) -> &LayoutParameters {
        &self.layout_parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[parser]
max_file_size_mb = 50

[search]
max_results = 20
default_scope = "components"
default_mode = "fuzzy"

[layout]
default_type = "force_directed"

[layout.parameters]
iterations = 10

[export]
output_path = "./reports"
formats = ["csv"]
archive = false
"#;

        let config = ViewerConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.parser.max_file_size_mb, 50);
        assert!(config.parser.resolve_references);
        assert_eq!(config.search.default_scope, SearchScope::Components);
        assert_eq!(config.search.default_mode, SearchMode::Fuzzy);
        assert_eq!(config.layout.default_type, Some(LayoutType::ForceDirected));
        assert_eq!(config.layout.parameters.iterations, 10);
        assert_eq!(config.layout.parameters.seed, 42);
        assert_eq!(config.recent.max_recent_files, 10);
        assert!(config.validate().is_ok());

        let job = config.job_for("model.arxml");
        assert_eq!(job.input_path(), "model.arxml");
        assert_eq!(job.output_path(), "./reports");
        assert_eq!(job.archive_name(), None);
        assert_eq!(job.export_formats(), ["csv".to_string()]);
        assert_eq!(job.parser_options().max_file_size_mb, 50);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.export.archive_name, "arxml_export.zip");
        assert_eq!(
            config.job_for("a.arxml").archive_name(),
            Some("arxml_export.zip")
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ARXML_TEST_OUTPUT_DIR", "/tmp/arxml-out");

        let toml_content = r#"
[export]
output_path = "${ARXML_TEST_OUTPUT_DIR}"
archive_name = "${ARXML_TEST_UNDEFINED_VAR}.zip"
"#;

        let config = ViewerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.export.output_path, "/tmp/arxml-out");
        assert_eq!(config.export.archive_name, "${ARXML_TEST_UNDEFINED_VAR}.zip");

        std::env::remove_var("ARXML_TEST_OUTPUT_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_format = ViewerConfig::from_toml_str("[export]\nformats = [\"xlsx\"]\n").unwrap();
        assert!(bad_format.validate().is_err());

        let bad_input = ViewerConfig::from_toml_str("[input]\nfiles = [\"model.txt\"]\n").unwrap();
        assert!(bad_input.validate().is_err());

        let bad_damping =
            ViewerConfig::from_toml_str("[layout.parameters]\ndamping = 1.5\n").unwrap();
        assert!(bad_damping.validate().is_err());

        let good_input =
            ViewerConfig::from_toml_str("[input]\nfiles = [\"a.arxml\", \"b.XML\"]\n").unwrap();
        assert!(good_input.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = ViewerConfig::from_toml_str("[export\n").unwrap_err();
        assert!(matches!(err, ViewerError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_recent_files() {
        let mut config = ViewerConfig::default();
        config.recent.max_recent_files = 3;

        for file in ["a.arxml", "b.arxml", "c.arxml", "a.arxml", "d.arxml"] {
            config.add_recent_file(file);
        }
        assert_eq!(config.recent.files, ["d.arxml", "a.arxml", "c.arxml"]);
        assert_eq!(config.recent.last_opened_file.as_deref(), Some("d.arxml"));

        assert!(config.remove_recent_file("a.arxml"));
        assert!(!config.remove_recent_file("zzz.arxml"));
        assert_eq!(config.recent.files, ["d.arxml", "c.arxml"]);
    }

    #[test]
    fn test_config_from_file_and_save() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[monitoring]\nenabled = true\n")
            .unwrap();

        let mut config = ViewerConfig::from_file(temp_file.path()).unwrap();
        assert!(config.monitoring_enabled());

        config.add_recent_file("model.arxml");
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("nested").join("config.toml");
        config.save_to_file(&saved).unwrap();

        let reloaded = ViewerConfig::load_or_default(&saved).unwrap();
        assert_eq!(reloaded, config);

        let missing = ViewerConfig::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(missing, ViewerConfig::default());
    }

    #[test]
    fn test_save_recent_files_leaves_other_settings_alone() {
        std::env::set_var("ARXML_RECENT_TEST_DIR", "/tmp/arxml-recent");
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[search]\nmax_results = 25\n\n[export]\noutput_path = \"${ARXML_RECENT_TEST_DIR}\"\n")
            .unwrap();

        let mut config = ViewerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.export.output_path, "/tmp/arxml-recent");

        // one-off values for this run only
        config.search.case_sensitive = true;
        config.layout.default_type = Some(LayoutType::Grid);
        config.monitoring.json_logs = true;
        config.add_recent_file("model.arxml");
        config.save_recent_files(temp_file.path()).unwrap();

        let raw = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(raw.contains("${ARXML_RECENT_TEST_DIR}"));

        let reloaded = ViewerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(reloaded.recent.files, ["model.arxml"]);
        assert_eq!(reloaded.recent.last_opened_file.as_deref(), Some("model.arxml"));
        assert_eq!(reloaded.search.max_results, 25);
        assert!(!reloaded.search.case_sensitive);
        assert_eq!(reloaded.layout.default_type, None);
        assert!(!reloaded.json_logs_enabled());

        std::env::remove_var("ARXML_RECENT_TEST_DIR");
    }

    #[test]
    fn test_save_recent_files_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ViewerConfig::default();
        config.search.max_results = 7;
        config.add_recent_file("a.arxml");
        config.save_recent_files(&path).unwrap();

        let reloaded = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(reloaded.recent.files, ["a.arxml"]);
        assert_eq!(reloaded.search.max_results, 100);
    }

    #[test]
    fn test_suggestion_threshold_and_json_logs() {
        let config = ViewerConfig::from_toml_str(
            "[search]\nauto_complete_min_chars = 3\n\n[monitoring]\njson_logs = true\n",
        )
        .unwrap();

        assert!(config.json_logs_enabled());
        assert!(!config.search.wants_suggestions("sp"));
        assert!(!config.search.wants_suggestions("  sp  "));
        assert!(config.search.wants_suggestions("spe"));
        assert!(ViewerConfig::default().search.wants_suggestions("ab"));
        assert!(!ViewerConfig::default().json_logs_enabled());
    }
}
