//! 评估入口
//!
//! 每次请求：读取规则 → 按优先级选择 → 解析决策。任何失败都降级为 `pending`，
//! 调用方永远拿到一个需要人工审核或已自动处理的决策。

use crate::defaults::default_rules;
use crate::dto::{RequestSubmission, UserRole};
use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Decision, FactBag, Rule};
use crate::resolver::DecisionResolver;
use crate::selector::RuleSelector;
use crate::store::RuleSource;
use approval_shared::config::RulesConfig;
use approval_shared::observability::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 读取规则的超时时间，超时视为存储不可用
    pub fetch_timeout: Duration,
    pub max_condition_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(2),
            max_condition_depth: crate::compiler::DEFAULT_MAX_DEPTH,
        }
    }
}

impl From<&RulesConfig> for EngineConfig {
    fn from(config: &RulesConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            max_condition_depth: config.max_condition_depth,
        }
    }
}

/// 规则集合的来源（用于日志和调用方诊断）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSetOrigin {
    Store,
    Defaults,
}

/// 审批规则引擎
///
/// 无内部状态，可在多个请求间共享并发调用。
#[derive(Clone)]
pub struct ApprovalEngine {
    source: Arc<dyn RuleSource>,
    selector: RuleSelector,
    fetch_timeout: Duration,
}

impl ApprovalEngine {
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: Arc<dyn RuleSource>, config: EngineConfig) -> Self {
        Self {
            source,
            selector: RuleSelector::new(ConditionEvaluator::with_max_depth(
                config.max_condition_depth,
            )),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// 评估一次请求，永不失败
    #[instrument(skip_all, fields(facts = facts.len()))]
    pub async fn evaluate_request(&self, facts: &FactBag) -> Decision {
        let start = Instant::now();

        let (rules, origin) = self.load_rules().await;
        let decision = self.decide(&rules, facts);

        info!(
            status = %decision.status,
            origin = ?origin,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request evaluated"
        );
        metrics::record_rule_evaluation(decision.status.as_str(), start.elapsed().as_secs_f64());

        decision
    }

    /// 对给定规则集合做出决策（不访问规则存储）
    pub fn decide(&self, rules: &[Rule], facts: &FactBag) -> Decision {
        match self.selector.select(rules, facts) {
            Ok(matched) => DecisionResolver::resolve(matched),
            Err(e) => {
                error!(code = e.code(), error = %e, "Error processing rules");
                DecisionResolver::error_fallback()
            }
        }
    }

    /// 校验提交的申请并评估
    ///
    /// 校验失败属于调用方输入错误，以 `Err` 返回；评估本身永不失败。
    pub async fn evaluate_submission(
        &self,
        submission: &RequestSubmission,
        role: Option<UserRole>,
    ) -> Result<Decision> {
        submission.validate()?;
        let facts = submission.to_facts(role);
        Ok(self.evaluate_request(&facts).await)
    }

    /// 读取规则；失败、超时或为空时回退到默认规则
    async fn load_rules(&self) -> (Vec<Rule>, RuleSetOrigin) {
        let fetched = match tokio::time::timeout(self.fetch_timeout, self.source.fetch_rules()).await
        {
            Ok(result) => result,
            Err(_) => Err(RuleError::StoreTimeout(self.fetch_timeout)),
        };

        match fetched {
            Ok(rules) if !rules.is_empty() => (rules, RuleSetOrigin::Store),
            Ok(_) => {
                warn!("No rules found in store, using default rules");
                metrics::record_store_fallback("EMPTY");
                (default_rules(), RuleSetOrigin::Defaults)
            }
            Err(e) => {
                warn!(
                    code = e.code(),
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to fetch rules, using default rules"
                );
                metrics::record_store_fallback(e.code());
                (default_rules(), RuleSetOrigin::Defaults)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConditionNode, DecisionStatus, Event};
    use crate::operators::Operator;
    use crate::resolver::{ERROR_MESSAGE, PENDING_MESSAGE};
    use crate::store::{InMemoryRuleSource, MockRuleSource};

    fn engine_with(rules: Vec<Rule>) -> ApprovalEngine {
        ApprovalEngine::new(Arc::new(InMemoryRuleSource::new(rules)))
    }

    #[tokio::test]
    async fn test_store_rules_used() {
        let engine = engine_with(vec![Rule::new(
            "reject everything",
            1,
            ConditionNode::all(vec![]),
            Event::new("auto-reject").with_message("No"),
        )]);

        let decision = engine
            .evaluate_request(&FactBag::new().with("amount", 50).with("type", "expense"))
            .await;
        assert_eq!(decision, Decision::new(DecisionStatus::Rejected, "No"));
    }

    #[tokio::test]
    async fn test_store_error_falls_back_to_defaults() {
        let mut source = MockRuleSource::new();
        source
            .expect_fetch_rules()
            .times(1)
            .returning(|| Err(RuleError::StoreUnavailable("connection refused".to_string())));
        let engine = ApprovalEngine::new(Arc::new(source));

        let decision = engine
            .evaluate_request(&FactBag::new().with("amount", 50).with("type", "expense"))
            .await;
        assert_eq!(decision.status, DecisionStatus::Approved);
        assert_eq!(decision.message, "Auto-approved: small expense");
    }

    #[tokio::test]
    async fn test_empty_store_falls_back_to_defaults() {
        let engine = engine_with(vec![]);

        let decision = engine
            .evaluate_request(&FactBag::new().with("amount", 5000).with("type", "loan"))
            .await;
        assert_eq!(decision.status, DecisionStatus::Pending);
        assert_eq!(decision.message, PENDING_MESSAGE);
    }

    struct SlowSource;

    #[async_trait::async_trait]
    impl RuleSource for SlowSource {
        async fn fetch_rules(&self) -> Result<Vec<Rule>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_falls_back_to_defaults() {
        let engine = ApprovalEngine::with_config(
            Arc::new(SlowSource),
            EngineConfig {
                fetch_timeout: Duration::from_millis(100),
                ..Default::default()
            },
        );

        let decision = engine
            .evaluate_request(&FactBag::new().with("amount", 200).with("type", "loan"))
            .await;
        assert_eq!(decision.status, DecisionStatus::Approved);
        assert_eq!(decision.message, "Auto-approved: small loan");
    }

    #[tokio::test]
    async fn test_evaluation_fault_is_pending() {
        let mut deep = ConditionNode::all(vec![]);
        for _ in 0..10 {
            deep = ConditionNode::all(vec![deep]);
        }
        let source = InMemoryRuleSource::new(vec![Rule::new(
            "deep",
            1,
            deep,
            Event::new("auto-approve"),
        )]);
        let engine = ApprovalEngine::with_config(
            Arc::new(source),
            EngineConfig {
                max_condition_depth: 4,
                ..Default::default()
            },
        );

        let decision = engine.evaluate_request(&FactBag::new()).await;
        assert_eq!(decision.status, DecisionStatus::Pending);
        assert_eq!(decision.message, ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_decide_without_store() {
        let engine = engine_with(vec![]);
        let rules = vec![Rule::new(
            "big",
            5,
            ConditionNode::predicate("amount", Operator::GreaterThan, 1000),
            Event::new("auto-reject"),
        )];

        let decision = engine.decide(&rules, &FactBag::new().with("amount", 2000));
        assert_eq!(decision.status, DecisionStatus::Rejected);

        let decision = engine.decide(&rules, &FactBag::new().with("amount", 10));
        assert_eq!(decision.status, DecisionStatus::Pending);
    }

    #[test]
    fn test_engine_config_from_rules_config() {
        let rules = RulesConfig {
            fetch_timeout_ms: 750,
            max_condition_depth: 8,
            ..Default::default()
        };
        let config = EngineConfig::from(&rules);
        assert_eq!(config.fetch_timeout, Duration::from_millis(750));
        assert_eq!(config.max_condition_depth, 8);
    }
}
