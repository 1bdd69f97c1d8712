//! 规则选择器
//!
//! 按优先级从高到低评估规则，返回第一条命中的规则。只有最高优先级的命中规则生效，
//! 低优先级的命中规则不会再被应用。

use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::models::{FactBag, Rule};
use std::cmp::Reverse;
use tracing::debug;

/// 规则选择器
#[derive(Debug, Clone, Default)]
pub struct RuleSelector {
    evaluator: ConditionEvaluator,
}

impl RuleSelector {
    pub fn new(evaluator: ConditionEvaluator) -> Self {
        Self { evaluator }
    }

    /// 按优先级降序排列；同优先级保持输入顺序（稳定排序）
    pub fn order(rules: &[Rule]) -> Vec<&Rule> {
        let mut ordered: Vec<&Rule> = rules.iter().collect();
        ordered.sort_by_key(|rule| Reverse(rule.priority));
        ordered
    }

    /// 选出第一条命中的规则
    pub fn select<'a>(&self, rules: &'a [Rule], facts: &FactBag) -> Result<Option<&'a Rule>> {
        for rule in Self::order(rules) {
            if self.evaluator.evaluate(&rule.conditions, facts)? {
                debug!(rule = %rule.name, priority = rule.priority, "Rule matched");
                return Ok(Some(rule));
            }
            debug!(rule = %rule.name, priority = rule.priority, "Rule not matched");
        }

        Ok(None)
    }
}
