//! 决策解析
//!
//! 把命中规则的事件映射为最终决策。未知事件类型不会被当作批准或拒绝。

use crate::models::{Decision, DecisionStatus, EventKind, Rule};
use tracing::warn;

pub const PENDING_MESSAGE: &str = "Requires admin review";
pub const ERROR_MESSAGE: &str = "Error processing rules, requires admin review";
pub const DEFAULT_APPROVE_MESSAGE: &str = "Auto-approved by rule engine";
pub const DEFAULT_REJECT_MESSAGE: &str = "Auto-rejected by rule engine";

pub struct DecisionResolver;

impl DecisionResolver {
    pub fn resolve(matched: Option<&Rule>) -> Decision {
        let Some(rule) = matched else {
            return Self::pending();
        };

        match &rule.event.kind {
            EventKind::AutoApprove => Decision::new(
                DecisionStatus::Approved,
                rule.event.message().unwrap_or(DEFAULT_APPROVE_MESSAGE),
            ),
            EventKind::AutoReject => Decision::new(
                DecisionStatus::Rejected,
                rule.event.message().unwrap_or(DEFAULT_REJECT_MESSAGE),
            ),
            EventKind::Other(kind) => {
                warn!(rule = %rule.name, event = %kind, "Unknown event kind, leaving request pending");
                Self::pending()
            }
        }
    }

    /// 无规则命中
    pub fn pending() -> Decision {
        Decision::new(DecisionStatus::Pending, PENDING_MESSAGE)
    }

    /// 评估过程出错
    pub fn error_fallback() -> Decision {
        Decision::new(DecisionStatus::Pending, ERROR_MESSAGE)
    }
}
