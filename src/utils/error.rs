use crate::domain::model::FaxActionType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaxError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error: missing mandatory key '{key}'")]
    MissingConfigError { key: String },

    #[error("Configuration error: invalid value '{value}' for key '{key}': {reason}")]
    InvalidConfigValueError {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Connection error: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: Option<Box<FaxError>>,
    },

    #[error("Unsupported operation: {action} is not supported by backend '{backend}'")]
    UnsupportedOperationError {
        action: FaxActionType,
        backend: String,
    },

    #[error("Invalid state for {action}: {message}")]
    InvalidStateError {
        action: FaxActionType,
        message: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Backend error during {action}: {message}")]
    BackendError {
        action: FaxActionType,
        message: String,
        #[source]
        source: Option<Box<FaxError>>,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    TimeoutError { operation: String, timeout_ms: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FaxError {
    pub fn unsupported(action: FaxActionType, backend: &str) -> Self {
        FaxError::UnsupportedOperationError {
            action,
            backend: backend.to_string(),
        }
    }

    pub fn backend(action: FaxActionType, message: impl Into<String>) -> Self {
        FaxError::BackendError {
            action,
            message: message.into(),
            source: None,
        }
    }

    /// 將傳輸層錯誤包裝成 `BackendError`，框架定義的錯誤則原樣返回
    pub fn wrap_transport(self, action: FaxActionType) -> Self {
        if self.is_transport_error() {
            FaxError::BackendError {
                action,
                message: self.to_string(),
                source: Some(Box::new(self)),
            }
        } else {
            self
        }
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            FaxError::IoError(_)
                | FaxError::ApiError(_)
                | FaxError::SerializationError(_)
                | FaxError::TimeoutError { .. }
        )
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FaxError::ConfigError { .. }
                | FaxError::MissingConfigError { .. }
                | FaxError::InvalidConfigValueError { .. }
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FaxError::ConfigError { .. }
            | FaxError::MissingConfigError { .. }
            | FaxError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
            FaxError::ConnectionError { .. }
            | FaxError::BackendError { .. }
            | FaxError::TimeoutError { .. }
            | FaxError::ApiError(_) => ErrorSeverity::Medium,
            FaxError::UnsupportedOperationError { .. }
            | FaxError::InvalidStateError { .. }
            | FaxError::ValidationError { .. }
            | FaxError::ParseError { .. }
            | FaxError::IoError(_)
            | FaxError::SerializationError(_) => ErrorSeverity::High,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            FaxError::UnsupportedOperationError { action, backend } => {
                format!("Backend '{}' cannot {} fax jobs", backend, action)
            }
            FaxError::InvalidStateError { action, .. } => {
                format!("Cannot {} a fax job that has not been submitted", action)
            }
            FaxError::BackendError { action, message, .. } => {
                format!("The fax backend rejected {}: {}", action, message)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            FaxError::MissingConfigError { key } => {
                format!("Add '{}' to the configuration file or pass --set {}=<value>", key, key)
            }
            FaxError::InvalidConfigValueError { key, .. } => {
                format!("Check the value configured for '{}'", key)
            }
            FaxError::ConfigError { .. } => {
                "Check the configuration file and the selected backend".to_string()
            }
            FaxError::ConnectionError { .. } => {
                "Verify the backend resource is reachable and retry".to_string()
            }
            FaxError::UnsupportedOperationError { backend, .. } => {
                format!("Backend '{}' does not offer this action; configure it or pick another backend", backend)
            }
            FaxError::InvalidStateError { .. } => {
                "Submit the fax job first, or pass the job id returned by the submission".to_string()
            }
            FaxError::ValidationError { .. } => {
                "Provide a target address and a file for the fax job".to_string()
            }
            FaxError::ParseError { .. } => {
                "Check the request arguments, e.g. -target_address:123 -file:/path/to/doc.pdf".to_string()
            }
            FaxError::TimeoutError { .. } => {
                "Increase the backend timeout or check the remote service".to_string()
            }
            FaxError::BackendError { .. } | FaxError::ApiError(_) => {
                "Inspect the backend response and retry the operation".to_string()
            }
            FaxError::IoError(_) => "Check file paths and permissions".to_string(),
            FaxError::SerializationError(_) => {
                "The backend returned malformed data; check the response format settings".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_transport_wraps_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let wrapped = FaxError::IoError(io).wrap_transport(FaxActionType::Submit);

        match wrapped {
            FaxError::BackendError { action, source, .. } => {
                assert_eq!(action, FaxActionType::Submit);
                assert!(matches!(source.as_deref(), Some(FaxError::IoError(_))));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrap_transport_keeps_taxonomy_errors() {
        let err = FaxError::unsupported(FaxActionType::Cancel, "mail")
            .wrap_transport(FaxActionType::Cancel);
        assert!(matches!(err, FaxError::UnsupportedOperationError { .. }));
    }

    #[test]
    fn test_messages_name_key_and_action() {
        let missing = FaxError::MissingConfigError {
            key: "faxkit.http.http.url".to_string(),
        };
        assert!(missing.to_string().contains("faxkit.http.http.url"));
        assert!(missing.is_configuration_error());
        assert_eq!(missing.severity(), ErrorSeverity::Critical);

        let state = FaxError::InvalidStateError {
            action: FaxActionType::Resume,
            message: "fax job has no id".to_string(),
        };
        assert!(state.to_string().contains("resume"));
    }
}
