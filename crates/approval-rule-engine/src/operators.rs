//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 条件操作符
///
/// 序列化名称沿用规则编辑器保存的 JSON 格式（camelCase）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    // 通用比较
    Equal,
    NotEqual,

    // 数值比较
    LessThan,
    #[serde(alias = "lessThanOrEqual")]
    LessThanInclusive,
    GreaterThan,
    #[serde(alias = "greaterThanOrEqual")]
    GreaterThanInclusive,

    // 集合包含
    In,
    NotIn,
}

/// 操作符对比较值的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// 任意标量
    Scalar,
    /// 数值
    Number,
    /// 标量列表
    List,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Self::Equal,
        Self::NotEqual,
        Self::LessThan,
        Self::LessThanInclusive,
        Self::GreaterThan,
        Self::GreaterThanInclusive,
        Self::In,
        Self::NotIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::LessThan => "lessThan",
            Self::LessThanInclusive => "lessThanInclusive",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanInclusive => "greaterThanInclusive",
            Self::In => "in",
            Self::NotIn => "notIn",
        }
    }

    pub fn operand_kind(&self) -> OperandKind {
        match self {
            Self::Equal | Self::NotEqual => OperandKind::Scalar,
            Self::LessThan
            | Self::LessThanInclusive
            | Self::GreaterThan
            | Self::GreaterThanInclusive => OperandKind::Number,
            Self::In | Self::NotIn => OperandKind::List,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lessThanOrEqual" => return Ok(Self::LessThanInclusive),
            "greaterThanOrEqual" => return Ok(Self::GreaterThanInclusive),
            _ => {}
        }
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}
