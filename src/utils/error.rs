use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid or unrecognized Scribd URL format: {url} ({reason})")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("Missing or invalid {field} in request body.")]
    MissingField { field: String },

    #[error("Method {method} Not Allowed")]
    MethodNotAllowed { method: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Upstream {url} responded with status {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Download link not detected by {strategy} strategy: {detail}")]
    LinkNotDetected { strategy: String, detail: String },

    #[error("{stage} timed out after {}ms", .after.as_millis())]
    Timeout { stage: String, after: Duration },

    #[error("Browser error: {message}")]
    BrowserError { message: String },

    #[error("All strategies failed ({}): {last}", .attempts.join("; "))]
    AllStrategiesFailed {
        attempts: Vec<String>,
        last: Box<ResolveError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Upstream,
    Timeout,
    Browser,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ResolveError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSourceUrl { .. }
            | Self::MissingField { .. }
            | Self::MethodNotAllowed { .. } => ErrorCategory::Input,
            Self::HttpError(e) if e.is_timeout() => ErrorCategory::Timeout,
            Self::HttpError(_) | Self::UpstreamStatus { .. } | Self::LinkNotDetected { .. } => {
                ErrorCategory::Upstream
            }
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::BrowserError { .. } => ErrorCategory::Browser,
            Self::AllStrategiesFailed { last, .. } => last.category(),
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Upstream | ErrorCategory::Timeout => ErrorSeverity::Medium,
            ErrorCategory::Browser | ErrorCategory::Internal => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// HTTP status returned to callers of the serverless function.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            Self::AllStrategiesFailed { last, .. } => last.status_code(),
            _ => match self.category() {
                ErrorCategory::Input => 400,
                ErrorCategory::Timeout => 504,
                ErrorCategory::Upstream => 502,
                ErrorCategory::Browser
                | ErrorCategory::Configuration
                | ErrorCategory::Internal => 500,
            },
        }
    }

    /// Whether a strategy chain may move on to its next strategy after this error.
    pub fn allows_fallback(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Input | ErrorCategory::Configuration
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Pass a document URL such as https://www.scribd.com/document/<id>/<title>"
            }
            ErrorCategory::Upstream => {
                "The mirror site may have changed or be down; try another strategy or retry later"
            }
            ErrorCategory::Timeout => {
                "Increase the request or navigation timeout, or retry when the mirror is less busy"
            }
            ErrorCategory::Browser => {
                "Check that Chromium is installed or set CHROME_PATH to its executable"
            }
            ErrorCategory::Configuration => "Review the TOML config file and RESOLVER_* variables",
            ErrorCategory::Internal => "Re-run with --verbose and check the logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("輸入錯誤: {}", self),
            ErrorCategory::Upstream => format!("上游網站錯誤: {}", self),
            ErrorCategory::Timeout => format!("請求逾時: {}", self),
            ErrorCategory::Browser => format!("瀏覽器錯誤: {}", self),
            ErrorCategory::Configuration => format!("配置錯誤: {}", self),
            ErrorCategory::Internal => format!("內部錯誤: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let invalid = ResolveError::InvalidSourceUrl {
            url: "x".to_string(),
            reason: "no match".to_string(),
        };
        assert_eq!(invalid.status_code(), 400);
        assert!(invalid.to_string().contains("Scribd URL format"));

        let timeout = ResolveError::Timeout {
            stage: "navigation".to_string(),
            after: Duration::from_millis(55_000),
        };
        assert_eq!(timeout.status_code(), 504);
        assert_eq!(timeout.to_string(), "navigation timed out after 55000ms");

        let not_found = ResolveError::LinkNotDetected {
            strategy: "html".to_string(),
            detail: "no viewer link".to_string(),
        };
        assert_eq!(not_found.status_code(), 502);

        let method = ResolveError::MethodNotAllowed {
            method: "GET".to_string(),
        };
        assert_eq!(method.status_code(), 405);
        assert_eq!(method.to_string(), "Method GET Not Allowed");
    }

    #[test]
    fn test_all_strategies_failed_uses_last_error() {
        let err = ResolveError::AllStrategiesFailed {
            attempts: vec!["redirect: a".to_string(), "browser: b".to_string()],
            last: Box::new(ResolveError::Timeout {
                stage: "navigation".to_string(),
                after: Duration::from_secs(1),
            }),
        };
        assert_eq!(err.status_code(), 504);
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(err.to_string().contains("redirect: a; browser: b"));
    }

    #[test]
    fn test_allows_fallback() {
        assert!(ResolveError::LinkNotDetected {
            strategy: "redirect".to_string(),
            detail: String::new(),
        }
        .allows_fallback());
        assert!(!ResolveError::ConfigError {
            message: "bad".to_string(),
        }
        .allows_fallback());
        assert!(!ResolveError::MissingField {
            field: "scribdUrl".to_string(),
        }
        .allows_fallback());
    }
}
