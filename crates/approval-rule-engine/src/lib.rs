//! 审批规则引擎
//!
//! 根据可配置的规则自动判定审批申请，支持：
//! - JSON 规则定义和加载期校验
//! - All/Any 条件树的短路求值
//! - 按优先级选择首个命中规则
//! - 规则存储不可用时回退到内置默认规则
//!
//! ```no_run
//! use approval_engine::{ApprovalEngine, FactBag, InMemoryRuleSource, default_rules};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let engine = ApprovalEngine::new(Arc::new(InMemoryRuleSource::new(default_rules())));
//! let facts = FactBag::new().with("amount", 50).with("type", "expense");
//! let decision = engine.evaluate_request(&facts).await;
//! println!("{}: {}", decision.status, decision.message);
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod compiler;
pub mod defaults;
pub mod dto;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod operators;
pub mod resolver;
pub mod selector;
pub mod store;

pub use cache::CachedRuleSource;
pub use compiler::{CompileReport, RuleCompiler, RuleRecord};
pub use defaults::default_rules;
pub use dto::{RequestSubmission, RequestType, RuleDraft, UserRole};
pub use engine::{ApprovalEngine, EngineConfig};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use models::{
    ComparisonValue, ConditionNode, Decision, DecisionStatus, Event, EventKind, FactBag,
    Predicate, Rule, Scalar,
};
pub use operators::Operator;
pub use resolver::DecisionResolver;
pub use selector::RuleSelector;
pub use store::{FileRuleSource, InMemoryRuleSource, PgRuleSource, RuleSource};
