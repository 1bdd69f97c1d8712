//! 规则编译器
//!
//! 将外部保存的 JSON 规则记录解析为强类型的 [`Rule`]，在加载阶段拒绝格式错误的规则，
//! 避免在递归评估深处才暴露问题。

use crate::error::{Result, RuleError};
use crate::models::{ComparisonValue, ConditionNode, Event, Predicate, Rule, Scalar};
use crate::operators::{OperandKind, Operator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// 条件树默认最大层数
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// 未声明优先级时的默认值
pub const DEFAULT_PRIORITY: i64 = 1;

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

/// 原始规则记录（存储或编辑器中的 JSON 形状）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub conditions: Value,
    #[serde(default)]
    pub event: Value,
}

/// 批量编译中被拒绝的记录
#[derive(Debug)]
pub struct RejectedRule {
    /// 记录在输入中的位置
    pub index: usize,
    pub name: String,
    pub error: RuleError,
}

/// 批量编译结果，`rules` 保持输入顺序
#[derive(Debug, Default)]
pub struct CompileReport {
    pub rules: Vec<Rule>,
    pub rejected: Vec<RejectedRule>,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// 规则编译器
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    max_depth: usize,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 从 JSON 字符串编译单条规则
    pub fn compile_from_json(&self, json: &str) -> Result<Rule> {
        let value: Value = serde_json::from_str(json)?;
        self.compile_value(value)
    }

    /// 从 JSON 值编译单条规则
    pub fn compile_value(&self, value: Value) -> Result<Rule> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        let record: RuleRecord = serde_json::from_value(value)
            .map_err(|e| RuleError::invalid_rule(name, e.to_string()))?;
        self.compile(record)
    }

    /// 编译规则记录
    pub fn compile(&self, record: RuleRecord) -> Result<Rule> {
        let name = record.name.trim();
        if name.is_empty() {
            return Err(RuleError::invalid_rule("<unnamed>", "rule name cannot be empty"));
        }

        let conditions = parse_condition(&record.conditions, self.max_depth)
            .map_err(|reason| RuleError::invalid_rule(name, reason))?;
        let event = parse_event(&record.event).map_err(|reason| RuleError::invalid_rule(name, reason))?;

        Ok(Rule {
            name: record.name,
            priority: record.priority,
            conditions,
            event,
        })
    }

    /// 逐条编译，跳过格式错误的记录
    pub fn compile_batch<I>(&self, records: I) -> CompileReport
    where
        I: IntoIterator<Item = Value>,
    {
        let mut report = CompileReport::default();

        for (index, value) in records.into_iter().enumerate() {
            let name = value
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();

            match self.compile_value(value) {
                Ok(rule) => report.rules.push(rule),
                Err(error) => {
                    warn!(index, rule = %name, code = error.code(), error = %error, "Rejected rule record");
                    report.rejected.push(RejectedRule { index, name, error });
                }
            }
        }

        report
    }

    /// 校验已构造的规则（例如代码中直接拼装的规则）
    pub fn check(&self, rule: &Rule) -> Result<()> {
        if rule.name.trim().is_empty() {
            return Err(RuleError::invalid_rule("<unnamed>", "rule name cannot be empty"));
        }
        let depth = rule.conditions.depth();
        if depth > self.max_depth {
            return Err(RuleError::invalid_rule(
                &rule.name,
                format!("conditions nest {} levels, limit is {}", depth, self.max_depth),
            ));
        }
        Ok(())
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析条件树
///
/// 错误信息包含出错节点的路径，如 `conditions.all[1].operator`。
pub fn parse_condition(value: &Value, max_depth: usize) -> std::result::Result<ConditionNode, String> {
    parse_node(value, "conditions", 1, max_depth)
}

fn parse_node(
    value: &Value,
    path: &str,
    depth: usize,
    max_depth: usize,
) -> std::result::Result<ConditionNode, String> {
    if depth > max_depth {
        return Err(format!("{}: nesting exceeds {} levels", path, max_depth));
    }

    let obj = value
        .as_object()
        .ok_or_else(|| format!("{}: expected an object, got {}", path, json_type(value)))?;

    for unsupported in ["not", "condition"] {
        if obj.contains_key(unsupported) {
            return Err(format!("{}: '{}' conditions are not supported", path, unsupported));
        }
    }

    let kinds: Vec<&str> = ["all", "any", "fact"]
        .into_iter()
        .filter(|key| obj.contains_key(*key))
        .collect();

    match kinds.as_slice() {
        ["all"] => parse_children(obj, "all", path, depth, max_depth).map(ConditionNode::All),
        ["any"] => parse_children(obj, "any", path, depth, max_depth).map(ConditionNode::Any),
        ["fact"] => parse_predicate(obj, path).map(ConditionNode::Predicate),
        [] => Err(format!("{}: expected one of 'all', 'any' or 'fact'", path)),
        _ => Err(format!(
            "{}: ambiguous condition, found {}",
            path,
            kinds.join(" and ")
        )),
    }
}

fn parse_children(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    depth: usize,
    max_depth: usize,
) -> std::result::Result<Vec<ConditionNode>, String> {
    let items = obj
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("{}.{}: expected an array", path, key))?;

    items
        .iter()
        .enumerate()
        .map(|(i, child)| parse_node(child, &format!("{}.{}[{}]", path, key, i), depth + 1, max_depth))
        .collect()
}

fn parse_predicate(obj: &Map<String, Value>, path: &str) -> std::result::Result<Predicate, String> {
    let fact = obj
        .get("fact")
        .and_then(Value::as_str)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| format!("{}.fact: expected a non-empty string", path))?;

    let operator: Operator = obj
        .get("operator")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{}.operator: missing operator", path))?
        .parse()
        .map_err(|e| format!("{}.operator: {}", path, e))?;

    let raw = obj
        .get("value")
        .ok_or_else(|| format!("{}.value: missing comparison value", path))?;

    let value = parse_operand(operator, raw)
        .map_err(|reason| format!("{}.value: {}", path, reason))?;

    Ok(Predicate {
        fact: fact.to_string(),
        operator,
        value,
    })
}

/// 校验操作符与比较值的兼容性
fn parse_operand(operator: Operator, raw: &Value) -> std::result::Result<ComparisonValue, String> {
    match operator.operand_kind() {
        OperandKind::Scalar => Scalar::from_json(raw)
            .map(ComparisonValue::Scalar)
            .ok_or_else(|| format!("'{}' needs a scalar, got {}", operator, json_type(raw))),
        OperandKind::Number => match raw {
            Value::Number(n) => n
                .as_f64()
                .map(|n| ComparisonValue::Scalar(Scalar::Number(n)))
                .ok_or_else(|| format!("'{}' value is not representable", operator)),
            other => Err(format!("'{}' needs a number, got {}", operator, json_type(other))),
        },
        OperandKind::List => {
            let items = raw
                .as_array()
                .ok_or_else(|| format!("'{}' needs a list, got {}", operator, json_type(raw)))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    Scalar::from_json(item).ok_or_else(|| {
                        format!("'{}' list item {} is {}, not a scalar", operator, i, json_type(item))
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(ComparisonValue::List)
        }
    }
}

/// 解析事件，要求非空的 `type`
pub fn parse_event(value: &Value) -> std::result::Result<Event, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("event: expected an object, got {}", json_type(value)))?;

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "event.type: expected a non-empty string".to_string())?;

    let params = match obj.get("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params.clone(),
        Some(other) => {
            return Err(format!("event.params: expected an object, got {}", json_type(other)));
        }
    };

    Ok(Event {
        kind: kind.into(),
        params,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
