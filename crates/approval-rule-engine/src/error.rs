//! 规则引擎错误类型

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("fact not found: {0}")]
    FactNotFound(String),

    #[error("type mismatch for '{operator}': expected {expected}, got {actual}")]
    TypeMismatch {
        operator: String,
        expected: String,
        actual: String,
    },

    #[error("condition nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("invalid facts: {0}")]
    InvalidFacts(String),

    #[error("rule store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("rule store timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// 稳定的错误码，用于日志和指标标签
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRule { .. } => "INVALID_RULE",
            Self::FactNotFound(_) => "FACT_NOT_FOUND",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            Self::InvalidFacts(_) => "INVALID_FACTS",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::StoreTimeout(_) => "STORE_TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// 是否为暂时性故障（存储不可达、超时），区别于规则数据和配置本身的错误
    ///
    /// 规则文件不存在或无权限属于配置错误，不会自行恢复。
    pub fn is_transient(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) | Self::StoreTimeout(_) | Self::Database(_) => true,
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }

    /// 是否为单个谓词内部的失败（按"不满足"处理）
    pub fn is_predicate_local(&self) -> bool {
        matches!(self, Self::FactNotFound(_) | Self::TypeMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RuleError::invalid_rule("r1", "empty name");
        assert_eq!(err.code(), "INVALID_RULE");
        assert_eq!(err.to_string(), "invalid rule 'r1': empty name");
    }

    #[test]
    fn test_transient_classification() {
        assert!(RuleError::StoreTimeout(Duration::from_millis(10)).is_transient());
        assert!(RuleError::StoreUnavailable("down".to_string()).is_transient());
        assert!(!RuleError::invalid_rule("r1", "bad").is_transient());
        assert!(!RuleError::FactNotFound("amount".to_string()).is_transient());
    }

    #[test]
    fn test_io_transient_by_kind() {
        use std::io::{Error, ErrorKind};

        assert!(!RuleError::from(Error::from(ErrorKind::NotFound)).is_transient());
        assert!(!RuleError::from(Error::from(ErrorKind::PermissionDenied)).is_transient());
        assert!(RuleError::from(Error::from(ErrorKind::Interrupted)).is_transient());
        assert!(RuleError::from(Error::from(ErrorKind::TimedOut)).is_transient());
    }

    #[test]
    fn test_predicate_local() {
        assert!(RuleError::FactNotFound("amount".to_string()).is_predicate_local());
        assert!(!RuleError::DepthExceeded { limit: 4 }.is_predicate_local());
    }
}
