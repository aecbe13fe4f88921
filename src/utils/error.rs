use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("{context}: gave up after {attempts} attempts ({reason})")]
    RetriesExhausted {
        context: String,
        attempts: u32,
        reason: String,
    },

    #[error("{context}: page no longer exists (status {status})")]
    PageGone { context: String, status: u16 },

    #[error("No enriched datasets found under {root}, nothing to merge")]
    EmptyMergeInput { root: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
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

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::ApiError(_)
            | HarvestError::RetriesExhausted { .. }
            | HarvestError::PageGone { .. } => ErrorCategory::Network,
            HarvestError::CsvError(_)
            | HarvestError::IoError(_)
            | HarvestError::SerializationError(_) => ErrorCategory::Storage,
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::MissingConfigError { .. } => ErrorCategory::Configuration,
            HarvestError::ProcessingError { .. } | HarvestError::EmptyMergeInput { .. } => {
                ErrorCategory::Data
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HarvestError::ApiError(_)
            | HarvestError::RetriesExhausted { .. }
            | HarvestError::PageGone { .. } => ErrorSeverity::Medium,
            HarvestError::ProcessingError { .. } | HarvestError::EmptyMergeInput { .. } => {
                ErrorSeverity::High
            }
            HarvestError::CsvError(_) | HarvestError::SerializationError(_) => ErrorSeverity::High,
            HarvestError::IoError(_) => ErrorSeverity::Critical,
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HarvestError::ApiError(_) => "Check network connectivity and the search endpoint",
            HarvestError::RetriesExhausted { .. } => {
                "The remote service may be throttling or a page may be permanently broken; raise retry.wait_seconds and re-run, or delete the affected listing from the raw file"
            }
            HarvestError::PageGone { .. } => "Check that the configured URL is still published",
            HarvestError::CsvError(_) | HarvestError::SerializationError(_) => {
                "Delete the damaged checkpoint files for the affected area and re-run"
            }
            HarvestError::IoError(_) => "Check that output.data_dir exists and is writable",
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::MissingConfigError { .. } => {
                "Fix the configuration file and run again"
            }
            HarvestError::ProcessingError { .. } => "Re-run with --verbose for details",
            HarvestError::EmptyMergeInput { .. } => {
                "Run the collect and enrich stages before merging"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Storage => format!("Could not read or write data files: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Processing failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_merge_input_is_data_error() {
        let err = HarvestError::EmptyMergeInput {
            root: "data".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("nothing to merge"));
    }

    #[test]
    fn test_retries_exhausted_is_network_error() {
        let err = HarvestError::RetriesExhausted {
            context: "detail https://example.com/biz/1".to_string(),
            attempts: 3,
            reason: "status 503".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.to_string().contains("3 attempts"));
    }
}
