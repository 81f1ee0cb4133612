use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerlyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Azure DevOps returned {status}: {message}")]
    AzureDevOpsError { status: u16, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Document '{id}' already exists in container '{container}'")]
    DocumentConflict { container: String, id: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, WorkerlyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Remote,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WorkerlyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkerlyError::HttpError(_) => ErrorCategory::Network,
            WorkerlyError::AzureDevOpsError { .. } => ErrorCategory::Remote,
            WorkerlyError::IoError(_) | WorkerlyError::DocumentConflict { .. } => {
                ErrorCategory::Storage
            }
            WorkerlyError::ConfigError { .. }
            | WorkerlyError::ConfigValidationError { .. }
            | WorkerlyError::InvalidConfigValueError { .. }
            | WorkerlyError::MissingConfigError { .. } => ErrorCategory::Configuration,
            WorkerlyError::CsvError(_)
            | WorkerlyError::SerializationError(_)
            | WorkerlyError::ProcessingError { .. }
            | WorkerlyError::ValidationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WorkerlyError::DocumentConflict { .. } | WorkerlyError::ValidationError { .. } => {
                ErrorSeverity::Low
            }
            WorkerlyError::HttpError(_) => ErrorSeverity::Medium,
            WorkerlyError::AzureDevOpsError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            WorkerlyError::AzureDevOpsError { .. }
            | WorkerlyError::CsvError(_)
            | WorkerlyError::SerializationError(_)
            | WorkerlyError::ProcessingError { .. } => ErrorSeverity::High,
            WorkerlyError::IoError(_)
            | WorkerlyError::ConfigError { .. }
            | WorkerlyError::ConfigValidationError { .. }
            | WorkerlyError::InvalidConfigValueError { .. }
            | WorkerlyError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            WorkerlyError::HttpError(_) => "Check network connectivity and retry",
            WorkerlyError::AzureDevOpsError { status: 401, .. }
            | WorkerlyError::AzureDevOpsError { status: 403, .. } => {
                "Verify the personal access token has Work Items (Read) scope and has not expired"
            }
            WorkerlyError::AzureDevOpsError { status: 404, .. } => {
                "Verify the organization name and work item id"
            }
            WorkerlyError::AzureDevOpsError { .. } => "Retry later; Azure DevOps may be throttling",
            WorkerlyError::IoError(_) => "Check the storage directory exists and is writable",
            WorkerlyError::DocumentConflict { .. } => "The document already exists; nothing to do",
            WorkerlyError::ConfigError { .. }
            | WorkerlyError::ConfigValidationError { .. }
            | WorkerlyError::InvalidConfigValueError { .. }
            | WorkerlyError::MissingConfigError { .. } => {
                "Review the configuration file and environment variables"
            }
            WorkerlyError::CsvError(_)
            | WorkerlyError::SerializationError(_)
            | WorkerlyError::ProcessingError { .. } => {
                "Inspect the source data; a stored document or API payload may be malformed"
            }
            WorkerlyError::ValidationError { .. } => "Correct the input and try again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            WorkerlyError::HttpError(_) => "Could not reach Azure DevOps".to_string(),
            WorkerlyError::AzureDevOpsError { status, .. } => {
                format!("Azure DevOps rejected the request (HTTP {})", status)
            }
            WorkerlyError::MissingConfigError { field } => {
                format!("Configuration value '{}' is required", field)
            }
            WorkerlyError::ValidationError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Process exit code for a command that failed with this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerlyError::AzureDevOpsError { status: 404, .. })
    }
}

impl From<toml::de::Error> for WorkerlyError {
    fn from(e: toml::de::Error) -> Self {
        WorkerlyError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}
