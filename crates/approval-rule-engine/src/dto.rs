//! 请求 DTO 定义
//!
//! 审批申请提交表单和规则编辑表单，均在进入引擎前通过 `validator` 校验。

use crate::compiler::{RuleCompiler, RuleRecord};
use crate::error::Result;
use crate::models::{FactBag, Rule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// 申请类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Expense,
    Loan,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Loan => "loan",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "expense" => Ok(Self::Expense),
            "loan" => Ok(Self::Loan),
            other => Err(format!("unknown request type: {other}")),
        }
    }
}

/// 提交人角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Employee,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// 审批申请提交
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestSubmission {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[validate(range(exclusive_min = 0.0, message = "金额必须大于0"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 1000, message = "申请原因不能为空且不超过1000字符"))]
    pub reason: String,
}

impl RequestSubmission {
    pub fn new(request_type: RequestType, amount: f64, reason: impl Into<String>) -> Self {
        Self {
            request_type,
            amount,
            reason: reason.into(),
        }
    }

    /// 转换为评估用的事实集合
    ///
    /// 未知角色时不写入 `user_role`，引用该事实的断言判为不成立。
    pub fn to_facts(&self, role: Option<UserRole>) -> FactBag {
        let mut facts = FactBag::new()
            .with("amount", self.amount)
            .with("type", self.request_type.as_str());
        if let Some(role) = role {
            facts.insert("user_role", role.as_str());
        }
        facts
    }
}

/// 规则编辑表单
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuleDraft {
    #[validate(length(min = 1, max = 200, message = "规则名称长度必须在1-200个字符之间"))]
    pub name: String,
    #[validate(range(min = 0, message = "优先级不能为负数"))]
    pub priority: i64,
    pub conditions: Value,
    pub event: Value,
}

impl RuleDraft {
    /// 校验表单并编译为规则
    pub fn compile(self, compiler: &RuleCompiler) -> Result<Rule> {
        self.validate()?;
        compiler.compile(RuleRecord {
            name: self.name,
            priority: self.priority,
            conditions: self.conditions,
            event: self.event,
        })
    }
}
