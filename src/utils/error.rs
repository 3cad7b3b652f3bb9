use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML syntax error: {0}")]
    XmlError(#[from] roxmltree::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File too large: {path} ({size_mb:.1} MB, limit {limit_mb} MB)")]
    FileTooLarge {
        path: String,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("Not an AUTOSAR document: root element <{root}>")]
    NotAutosar { root: String },

    #[error("Parsing failed: {message}")]
    ParsingError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid search pattern '{pattern}': {message}")]
    SearchPatternError { pattern: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Parsing,
    Configuration,
    Output,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ViewerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ViewerError::IoError(_)
            | ViewerError::FileNotFound { .. }
            | ViewerError::FileTooLarge { .. } => ErrorCategory::Input,
            ViewerError::XmlError(_)
            | ViewerError::NotAutosar { .. }
            | ViewerError::ParsingError { .. } => ErrorCategory::Parsing,
            ViewerError::InvalidConfigValueError { .. }
            | ViewerError::MissingConfigError { .. }
            | ViewerError::ConfigValidationError { .. }
            | ViewerError::TomlError(_) => ErrorCategory::Configuration,
            ViewerError::SerializationError(_)
            | ViewerError::CsvError(_)
            | ViewerError::ZipError(_) => ErrorCategory::Output,
            ViewerError::SearchPatternError { .. } => ErrorCategory::Search,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ViewerError::SearchPatternError { .. } => ErrorSeverity::Low,
            ViewerError::FileTooLarge { .. } | ViewerError::NotAutosar { .. } => {
                ErrorSeverity::Medium
            }
            ViewerError::IoError(_) | ViewerError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ViewerError::IoError(_) => {
                "Check file permissions and that the output directory is writable".to_string()
            }
            ViewerError::XmlError(_) => {
                "The file is not well-formed XML; open it in an XML editor to locate the syntax error"
                    .to_string()
            }
            ViewerError::FileNotFound { .. } => {
                "Verify the path and that the file has an .arxml or .xml extension".to_string()
            }
            ViewerError::FileTooLarge { limit_mb, .. } => format!(
                "Raise [parser].max_file_size_mb above {} or split the ARXML file",
                limit_mb
            ),
            ViewerError::NotAutosar { .. } => {
                "Set [parser].require_autosar_root = false to inspect non-AUTOSAR XML".to_string()
            }
            ViewerError::ParsingError { .. } => {
                "Run with --debug to see which element could not be parsed".to_string()
            }
            ViewerError::InvalidConfigValueError { field, .. }
            | ViewerError::ConfigValidationError { field, .. } => {
                format!("Fix the '{}' setting in the configuration file", field)
            }
            ViewerError::MissingConfigError { field } => {
                format!("Add the '{}' setting to the configuration file", field)
            }
            ViewerError::TomlError(_) => "Check the configuration values for unsupported types".to_string(),
            ViewerError::SerializationError(_)
            | ViewerError::CsvError(_)
            | ViewerError::ZipError(_) => {
                "Try a different export format or output directory".to_string()
            }
            ViewerError::SearchPatternError { .. } => {
                "Escape regex metacharacters or use --mode contains".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ViewerError::FileNotFound { path } => format!("Cannot open '{}': file not found", path),
            ViewerError::XmlError(e) => format!("The file is not valid XML ({})", e),
            ViewerError::NotAutosar { root } => {
                format!("The file does not look like ARXML (root element <{}>)", root)
            }
            other => other.to_string(),
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        ViewerError::ParsingError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
