//! 规则引擎领域模型

use crate::compiler;
use crate::error::{Result, RuleError};
use crate::operators::Operator;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// 标量值（事实值和比较值共用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// 从 JSON 值转换，非标量返回 None
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// 谓词的比较值：单个标量或标量列表（用于 in / notIn）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl ComparisonValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(s) => s.type_name(),
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for ComparisonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! comparison_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ComparisonValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.into())
                }
            }

            impl From<Vec<$ty>> for ComparisonValue {
                fn from(values: Vec<$ty>) -> Self {
                    Self::List(values.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

comparison_value_from!(bool, f64, i64, i32, &str, String);

impl From<Scalar> for ComparisonValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<Scalar>> for ComparisonValue {
    fn from(values: Vec<Scalar>) -> Self {
        Self::List(values)
    }
}

/// 事实集合 - 每次评估调用时新建，评估期间只读
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactBag {
    facts: BTreeMap<String, Scalar>,
}

impl FactBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加事实
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.facts.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.facts.get(name)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.facts.iter()
    }

    /// 从 JSON 对象创建
    ///
    /// `null` 值视为缺失事实；嵌套对象和数组不是合法的事实值。
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| RuleError::InvalidFacts("facts must be a JSON object".to_string()))?;

        let mut bag = Self::new();
        for (name, raw) in map {
            if raw.is_null() {
                continue;
            }
            let scalar = Scalar::from_json(raw).ok_or_else(|| {
                RuleError::InvalidFacts(format!("fact '{}' is not a scalar value", name))
            })?;
            bag.facts.insert(name.clone(), scalar);
        }
        Ok(bag)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for FactBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

/// 谓词：事实 <操作符> 比较值
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub fact: String,
    pub operator: Operator,
    pub value: ComparisonValue,
}

impl Predicate {
    pub fn new(
        fact: impl Into<String>,
        operator: Operator,
        value: impl Into<ComparisonValue>,
    ) -> Self {
        Self {
            fact: fact.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.fact, self.operator, self.value)
    }
}

/// 条件树节点
///
/// JSON 形式为 `{"all": [...]}`、`{"any": [...]}` 或
/// `{"fact": ..., "operator": ..., "value": ...}`。
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    All(Vec<ConditionNode>),
    Any(Vec<ConditionNode>),
    Predicate(Predicate),
}

impl ConditionNode {
    pub fn all(children: Vec<ConditionNode>) -> Self {
        Self::All(children)
    }

    pub fn any(children: Vec<ConditionNode>) -> Self {
        Self::Any(children)
    }

    pub fn predicate(
        fact: impl Into<String>,
        operator: Operator,
        value: impl Into<ComparisonValue>,
    ) -> Self {
        Self::Predicate(Predicate::new(fact, operator, value))
    }

    /// 树的层数（单个谓词为 1）
    pub fn depth(&self) -> usize {
        match self {
            Self::All(children) | Self::Any(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Predicate(_) => 1,
        }
    }

    /// 树中引用的所有事实名
    pub fn facts(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_facts(&mut names);
        names.sort_unstable();
        names.dedup();
        names
    }

    fn collect_facts<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_facts(names);
                }
            }
            Self::Predicate(p) => names.push(&p.fact),
        }
    }
}

impl Serialize for ConditionNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::All(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("all", children)?;
                map.end()
            }
            Self::Any(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("any", children)?;
                map.end()
            }
            Self::Predicate(p) => {
                let mut state = serializer.serialize_struct("Predicate", 3)?;
                state.serialize_field("fact", &p.fact)?;
                state.serialize_field("operator", &p.operator)?;
                state.serialize_field("value", &p.value)?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ConditionNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        compiler::parse_condition(&value, compiler::DEFAULT_MAX_DEPTH)
            .map_err(serde::de::Error::custom)
    }
}

/// 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    AutoApprove,
    AutoReject,
    /// 未识别的事件类型，解析时保留原始名称
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AutoApprove => "auto-approve",
            Self::AutoReject => "auto-reject",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "auto-approve" => Self::AutoApprove,
            "auto-reject" => Self::AutoReject,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规则命中后产生的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub params: Map<String, Value>,
}

impl Event {
    pub fn new(kind: impl Into<EventKind>) -> Self {
        Self {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.params
            .insert("message".to_string(), Value::String(message.into()));
        self
    }

    /// 人类可读的说明（params.message），空字符串视为未设置
    pub fn message(&self) -> Option<&str> {
        self.params
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        compiler::parse_event(&value).map_err(serde::de::Error::custom)
    }
}

/// 规则定义
///
/// 反序列化与 [`compiler::RuleCompiler`] 共用同一套加载期校验。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    pub priority: i64,
    pub conditions: ConditionNode,
    pub event: Event,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        priority: i64,
        conditions: ConditionNode,
        event: Event,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            conditions,
            event,
        }
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        compiler::RuleCompiler::new()
            .compile_value(value)
            .map_err(serde::de::Error::custom)
    }
}

/// 决策状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Approved,
    Rejected,
    Pending,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次评估的最终决策
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub status: DecisionStatus,
    pub message: String,
}

impl Decision {
    pub fn new(status: DecisionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DecisionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_deserialization() {
        let rule: Rule = serde_json::from_value(json!({
            "name": "Auto-approve small expenses",
            "priority": 10,
            "conditions": {
                "all": [
                    {"fact": "amount", "operator": "lessThan", "value": 100},
                    {"fact": "type", "operator": "equal", "value": "expense"}
                ]
            },
            "event": {
                "type": "auto-approve",
                "params": {"message": "Auto-approved: small expense"}
            }
        }))
        .unwrap();

        assert_eq!(rule.priority, 10);
        assert_eq!(rule.event.kind, EventKind::AutoApprove);
        assert_eq!(rule.event.message(), Some("Auto-approved: small expense"));
        match &rule.conditions {
            ConditionNode::All(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_rule_deserialization_applies_load_checks() {
        let err = serde_json::from_value::<Rule>(json!({
            "name": "",
            "priority": 1,
            "conditions": {"all": []},
            "event": {"type": "auto-approve"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("name"));

        let err = serde_json::from_value::<Rule>(json!({
            "name": "blank event",
            "conditions": {"all": []},
            "event": {"type": "  "}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("event.type"));

        // 缺省优先级与编译器一致
        let rule: Rule = serde_json::from_value(json!({
            "name": "no priority",
            "conditions": {"all": []},
            "event": {"type": "auto-reject"}
        }))
        .unwrap();
        assert_eq!(rule.priority, compiler::DEFAULT_PRIORITY);
    }

    #[test]
    fn test_rule_serialize_then_deserialize() {
        let rule = Rule::new(
            "round trip",
            7,
            ConditionNode::predicate("amount", Operator::GreaterThanInclusive, 10),
            Event::new("auto-reject").with_message("Too much"),
        );
        let parsed: Rule = serde_json::from_value(serde_json::to_value(&rule).unwrap()).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_blank_event_type_rejected() {
        assert!(serde_json::from_value::<Event>(json!({"type": ""})).is_err());
        assert!(serde_json::from_value::<Event>(json!({"type": "auto-approve", "params": 3})).is_err());
    }

    #[test]
    fn test_condition_serialization_shape() {
        let node = ConditionNode::any(vec![
            ConditionNode::predicate("type", Operator::In, vec!["expense", "loan"]),
            ConditionNode::all(vec![]),
        ]);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "any": [
                    {"fact": "type", "operator": "in", "value": ["expense", "loan"]},
                    {"all": []}
                ]
            })
        );

        let parsed: ConditionNode = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_malformed_condition_rejected() {
        let err = serde_json::from_value::<ConditionNode>(json!({"all": [{"fact": "amount"}]}))
            .unwrap_err();
        assert!(err.to_string().contains("operator"));
    }

    #[test]
    fn test_unknown_event_kind_preserved() {
        let event: Event = serde_json::from_value(json!({"type": "escalate"})).unwrap();
        assert_eq!(event.kind, EventKind::Other("escalate".to_string()));
        assert!(event.params.is_empty());
        assert_eq!(serde_json::to_value(&event.kind).unwrap(), json!("escalate"));
    }

    #[test]
    fn test_fact_bag_from_json() {
        let facts =
            FactBag::from_json(&json!({"amount": 50, "type": "expense", "user_role": null}))
                .unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts.get("amount"), Some(&Scalar::Number(50.0)));
        assert_eq!(facts.get("user_role"), None);

        assert!(FactBag::from_json(&json!({"items": [1, 2]})).is_err());
        assert!(FactBag::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_condition_depth_and_facts() {
        let node = ConditionNode::all(vec![
            ConditionNode::predicate("amount", Operator::LessThan, 100),
            ConditionNode::any(vec![
                ConditionNode::predicate("type", Operator::Equal, "expense"),
                ConditionNode::predicate("amount", Operator::GreaterThan, 0),
            ]),
        ]);
        assert_eq!(node.depth(), 3);
        assert_eq!(node.facts(), vec!["amount", "type"]);
    }

    #[test]
    fn test_decision_status_serialization() {
        let decision = Decision::new(DecisionStatus::Approved, "ok");
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            json!({"status": "approved", "message": "ok"})
        );
    }
}
