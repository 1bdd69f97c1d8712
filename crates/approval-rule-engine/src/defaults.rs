//! 内置默认规则
//!
//! 规则存储不可用或为空时使用，保证系统始终有决策逻辑。

use crate::models::{ConditionNode, Event, Rule};
use crate::operators::Operator;

/// 小额报销阈值（不含）
pub const SMALL_EXPENSE_THRESHOLD: f64 = 100.0;
/// 小额借款阈值（不含）
pub const SMALL_LOAN_THRESHOLD: f64 = 500.0;
pub const DEFAULT_RULE_PRIORITY: i64 = 10;

pub fn default_rules() -> Vec<Rule> {
    vec![
        small_amount_rule(
            "Auto-approve small expenses",
            "expense",
            SMALL_EXPENSE_THRESHOLD,
            "Auto-approved: small expense",
        ),
        small_amount_rule(
            "Auto-approve small loans",
            "loan",
            SMALL_LOAN_THRESHOLD,
            "Auto-approved: small loan",
        ),
    ]
}

fn small_amount_rule(name: &str, request_type: &str, threshold: f64, message: &str) -> Rule {
    Rule::new(
        name,
        DEFAULT_RULE_PRIORITY,
        ConditionNode::all(vec![
            ConditionNode::predicate("amount", Operator::LessThan, threshold),
            ConditionNode::predicate("type", Operator::Equal, request_type),
        ]),
        Event::new("auto-approve").with_message(message),
    )
}
