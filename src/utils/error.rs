use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Source is not valid UTF-8: {0}")]
    EncodingError(#[from] std::string::FromUtf8Error),

    #[error("Error in {file}:{line}, {message}")]
    ParseError {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    FileSystem,
    Parse,
    Serialization,
    Configuration,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Transient, running again may succeed.
    Medium,
    /// Bad input or configuration.
    High,
    /// The environment itself is broken.
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::ApiError(_) | ExportError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            ExportError::IoError(_) => ErrorCategory::FileSystem,
            ExportError::ParseError { .. } | ExportError::EncodingError(_) => ErrorCategory::Parse,
            ExportError::SerializationError(_) => ErrorCategory::Serialization,
            ExportError::ConfigError { .. }
            | ExportError::MissingConfigError { .. }
            | ExportError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ExportError::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::ApiError(_) => ErrorSeverity::Medium,
            ExportError::HttpStatusError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            ExportError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ExportError::ApiError(_) => {
                "Check the network connection and that the source URL is reachable".to_string()
            }
            ExportError::HttpStatusError { status, .. } if *status >= 500 => {
                "The remote server failed, try again later".to_string()
            }
            ExportError::HttpStatusError { .. } => {
                "Check that the source URL points to an existing PDL file".to_string()
            }
            ExportError::IoError(_) => {
                "Check that the input file exists and the output directory is writable".to_string()
            }
            ExportError::SerializationError(_) => {
                "If the source is JSON, make sure it is a protocol document".to_string()
            }
            ExportError::EncodingError(_) => "Save the source file as UTF-8".to_string(),
            ExportError::ParseError { file, line, .. } => {
                format!("Fix the PDL syntax in {} near line {}", file, line)
            }
            ExportError::ConfigError { .. }
            | ExportError::MissingConfigError { .. }
            | ExportError::InvalidConfigValueError { .. } => {
                "Run with --help to see the accepted options".to_string()
            }
            ExportError::ValidationError { .. } => "Review the job definitions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExportError::ApiError(_) | ExportError::HttpStatusError { .. } => {
                format!("Could not download the protocol source ({})", self)
            }
            ExportError::IoError(e) => format!("File operation failed: {}", e),
            ExportError::ParseError { .. } => format!("Invalid protocol definition. {}", self),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
