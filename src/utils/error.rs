use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubezError {
    #[error("Kubernetes API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Docker API error: {0}")]
    DockerError(#[from] bollard::errors::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Kubeconfig parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Kubeconfig error: {message}")]
    KubeconfigError { message: String },

    #[error("Kubernetes API returned {status} ({reason}): {message}")]
    KubeApiError {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("Container '{name}' error: {message}")]
    ContainerError { name: String, message: String },

    #[error("Template error: {message}")]
    TemplateError { message: String },

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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Kubernetes,
    Docker,
    FileSystem,
    Serialization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl KubezError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            KubezError::HttpError(_)
            | KubezError::KubeconfigError { .. }
            | KubezError::YamlError(_)
            | KubezError::KubeApiError { .. } => ErrorCategory::Kubernetes,
            KubezError::DockerError(_) | KubezError::ContainerError { .. } => {
                ErrorCategory::Docker
            }
            KubezError::IoError(_) | KubezError::TemplateError { .. } => {
                ErrorCategory::FileSystem
            }
            KubezError::SerializationError(_) => ErrorCategory::Serialization,
            KubezError::ConfigError { .. }
            | KubezError::ConfigValidationError { .. }
            | KubezError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路或 API 暫時性錯誤，可重試
            KubezError::HttpError(_) => ErrorSeverity::Medium,
            KubezError::KubeApiError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            KubezError::KubeApiError { .. } => ErrorSeverity::High,
            KubezError::DockerError(_) | KubezError::ContainerError { .. } => ErrorSeverity::High,
            KubezError::TemplateError { .. } | KubezError::SerializationError(_) => {
                ErrorSeverity::High
            }
            // 主機層級問題：檔案系統、憑證
            KubezError::IoError(_)
            | KubezError::KubeconfigError { .. }
            | KubezError::YamlError(_) => ErrorSeverity::Critical,
            KubezError::ConfigError { .. }
            | KubezError::ConfigValidationError { .. }
            | KubezError::InvalidConfigValueError { .. } => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            KubezError::HttpError(_) => {
                "Could not reach the Kubernetes API server".to_string()
            }
            KubezError::KubeApiError {
                status, message, ..
            } => format!("Kubernetes rejected the request ({}): {}", status, message),
            KubezError::DockerError(e) => format!("Docker daemon call failed: {}", e),
            KubezError::ContainerError { name, message } => {
                format!("Container '{}' could not be managed: {}", name, message)
            }
            KubezError::KubeconfigError { message } => {
                format!("Kubeconfig is not usable: {}", message)
            }
            KubezError::YamlError(e) => format!("Kubeconfig is not valid YAML: {}", e),
            KubezError::IoError(e) => format!("File system error: {}", e),
            KubezError::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("Setting '{}' has invalid value '{}': {}", field, value, reason),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line flags or the TOML configuration file"
            }
            ErrorCategory::Kubernetes => match self {
                KubezError::KubeApiError { status: 404, .. } => {
                    "Make sure the service exists in the given namespace"
                }
                KubezError::KubeApiError { status: 401, .. }
                | KubezError::KubeApiError { status: 403, .. } => {
                    "Check the credentials in the kubeconfig file"
                }
                KubezError::KubeconfigError { .. } | KubezError::YamlError(_) => {
                    "Point --kubeconfig at a valid admin kubeconfig"
                }
                _ => "Verify the API server is reachable and retry",
            },
            ErrorCategory::Docker => {
                "Make sure the Docker daemon is running and the image is reachable"
            }
            ErrorCategory::FileSystem => "Check permissions on the kubez directory",
            ErrorCategory::Serialization => "This is likely a bug; please report it",
        }
    }
}

pub type Result<T> = std::result::Result<T, KubezError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kube_api_error_severity_depends_on_status() {
        let server_side = KubezError::KubeApiError {
            status: 503,
            reason: "ServiceUnavailable".to_string(),
            message: "etcd unavailable".to_string(),
        };
        assert_eq!(server_side.severity(), ErrorSeverity::Medium);

        let not_found = KubezError::KubeApiError {
            status: 404,
            reason: "NotFound".to_string(),
            message: "services \"ingress-nginx\" not found".to_string(),
        };
        assert_eq!(not_found.severity(), ErrorSeverity::High);
        assert_eq!(not_found.category(), ErrorCategory::Kubernetes);
        assert!(not_found.recovery_suggestion().contains("service exists"));
    }

    #[test]
    fn test_io_error_is_critical() {
        let err = KubezError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.category(), ErrorCategory::FileSystem);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_for_invalid_value() {
        let err = KubezError::InvalidConfigValueError {
            field: "nginx.lb_port".to_string(),
            value: "0".to_string(),
            reason: "Value must be between 1 and 65535".to_string(),
        };
        assert_eq!(
            err.user_friendly_message(),
            "Setting 'nginx.lb_port' has invalid value '0': Value must be between 1 and 65535"
        );
    }
}
