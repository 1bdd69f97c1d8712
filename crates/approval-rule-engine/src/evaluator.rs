//! 条件评估器
//!
//! 递归评估条件树。单个谓词的失败（事实缺失、类型不匹配）只让该谓词为 false，
//! 不会中断整棵树的评估。

use crate::compiler::DEFAULT_MAX_DEPTH;
use crate::error::{Result, RuleError};
use crate::models::{ComparisonValue, ConditionNode, FactBag, Predicate, Scalar};
use crate::operators::Operator;
use std::cmp::Ordering;
use tracing::debug;

/// 条件评估器
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    max_depth: usize,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 评估条件树
    ///
    /// 只有超出层数限制会返回错误；谓词级别的错误按"不满足"处理。
    pub fn evaluate(&self, node: &ConditionNode, facts: &FactBag) -> Result<bool> {
        self.evaluate_node(node, facts, 1)
    }

    fn evaluate_node(&self, node: &ConditionNode, facts: &FactBag, depth: usize) -> Result<bool> {
        if depth > self.max_depth {
            return Err(RuleError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        match node {
            // 空 all 恒为 true
            ConditionNode::All(children) => {
                for child in children {
                    if !self.evaluate_node(child, facts, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            // 空 any 恒为 false
            ConditionNode::Any(children) => {
                for child in children {
                    if self.evaluate_node(child, facts, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ConditionNode::Predicate(predicate) => match Self::check(predicate, facts) {
                Ok(matched) => Ok(matched),
                Err(e) if e.is_predicate_local() => {
                    debug!(predicate = %predicate, code = e.code(), error = %e, "Predicate failed closed");
                    Ok(false)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// 严格评估单个谓词，返回失败原因
    pub fn check(predicate: &Predicate, facts: &FactBag) -> Result<bool> {
        let fact = facts
            .get(&predicate.fact)
            .ok_or_else(|| RuleError::FactNotFound(predicate.fact.clone()))?;

        Self::apply(predicate.operator, fact, &predicate.value)
    }

    /// 操作符分派
    pub fn apply(operator: Operator, fact: &Scalar, expected: &ComparisonValue) -> Result<bool> {
        match operator {
            Operator::Equal => Self::scalar(operator, expected).map(|v| Self::eq(fact, v)),
            Operator::NotEqual => Self::scalar(operator, expected).map(|v| !Self::eq(fact, v)),
            Operator::LessThan => Self::compare(operator, fact, expected, Ordering::is_lt),
            Operator::LessThanInclusive => Self::compare(operator, fact, expected, Ordering::is_le),
            Operator::GreaterThan => Self::compare(operator, fact, expected, Ordering::is_gt),
            Operator::GreaterThanInclusive => {
                Self::compare(operator, fact, expected, Ordering::is_ge)
            }
            Operator::In => Self::list(operator, expected).map(|items| Self::contains(items, fact)),
            Operator::NotIn => {
                Self::list(operator, expected).map(|items| !Self::contains(items, fact))
            }
        }
    }

    /// 相等比较：不同类型的标量视为不相等
    fn eq(fact: &Scalar, expected: &Scalar) -> bool {
        match (fact, expected) {
            (Scalar::Number(a), Scalar::Number(b)) => a == b,
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// 数值比较
    fn compare<F>(operator: Operator, fact: &Scalar, expected: &ComparisonValue, cmp: F) -> Result<bool>
    where
        F: Fn(Ordering) -> bool,
    {
        let field_num = fact.as_f64().ok_or_else(|| Self::mismatch(operator, "number", fact.type_name()))?;

        let expected_num = match expected {
            ComparisonValue::Scalar(Scalar::Number(n)) => *n,
            other => return Err(Self::mismatch(operator, "number", other.type_name())),
        };

        // NaN 无法排序，视为不满足
        Ok(field_num
            .partial_cmp(&expected_num)
            .map(cmp)
            .unwrap_or(false))
    }

    fn contains(items: &[Scalar], fact: &Scalar) -> bool {
        items.iter().any(|item| Self::eq(fact, item))
    }

    fn scalar(operator: Operator, expected: &ComparisonValue) -> Result<&Scalar> {
        match expected {
            ComparisonValue::Scalar(s) => Ok(s),
            other => Err(Self::mismatch(operator, "scalar", other.type_name())),
        }
    }

    fn list(operator: Operator, expected: &ComparisonValue) -> Result<&[Scalar]> {
        match expected {
            ComparisonValue::List(items) => Ok(items),
            other => Err(Self::mismatch(operator, "list", other.type_name())),
        }
    }

    fn mismatch(operator: Operator, expected: &str, actual: &str) -> RuleError {
        RuleError::TypeMismatch {
            operator: operator.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
