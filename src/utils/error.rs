use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtraError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing field '{field}' at {path}")]
    MissingFieldError { path: String, field: String },

    #[error("Invalid field '{field}' at {path}: {reason}")]
    InvalidFieldError {
        path: String,
        field: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Integrity check failed for form '{form_ref}': {violations} violation(s)")]
    IntegrityError { form_ref: String, violations: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Definition,
    Configuration,
    Integrity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExtraError {
    pub fn missing(path: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingFieldError {
            path: path.into(),
            field: field.into(),
        }
    }

    pub fn invalid(
        path: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFieldError {
            path: path.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ZipError(_) | Self::IoError(_) => ErrorCategory::Io,
            Self::SerializationError(_)
            | Self::MissingFieldError { .. }
            | Self::InvalidFieldError { .. } => ErrorCategory::Definition,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::IntegrityError { .. } => ErrorCategory::Integrity,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Integrity => ErrorSeverity::Medium,
            ErrorCategory::Definition | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ZipError(_) => "Check that the output directory is writable or disable bundling",
            Self::IoError(_) => "Check that the input path exists and the output path is writable",
            Self::SerializationError(_) => "Make sure the definition file is valid JSON",
            Self::MissingFieldError { .. } | Self::InvalidFieldError { .. } => {
                "Re-export the project definition from the form builder"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags"
            }
            Self::IntegrityError { .. } => {
                "Run with --verbose to list violations, or pass --no-strict to write anyway"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingFieldError { path, field } => {
                format!("The project definition is missing '{}' at {}", field, path)
            }
            Self::IntegrityError {
                form_ref,
                violations,
            } => format!(
                "Generated structure for form {} has {} inconsistent reference(s)",
                form_ref, violations
            ),
            other => other.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtraError>;
