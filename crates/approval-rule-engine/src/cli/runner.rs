//! 命令执行器
//!
//! 将命令行参数转化为规则来源的构建和引擎调用，结果以 JSON 输出到标准输出。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use approval_shared::config::{AppConfig, RuleSourceKind};
use approval_shared::database::Database;

use crate::cache::CachedRuleSource;
use crate::compiler::RuleCompiler;
use crate::defaults::default_rules;
use crate::dto::{RequestSubmission, RequestType, UserRole};
use crate::engine::{ApprovalEngine, EngineConfig};
use crate::models::{Decision, FactBag};
use crate::store::{FileRuleSource, PgRuleSource, RuleSource};

/// 申请表单参数
#[derive(Debug, Clone)]
pub struct SubmissionArgs {
    pub request_type: RequestType,
    pub amount: f64,
    pub reason: String,
    pub role: Option<UserRole>,
}

/// `evaluate` 的输入
#[derive(Debug, Clone)]
pub enum EvaluateInput {
    Facts(String),
    Submission(SubmissionArgs),
}

/// `check-rules` 中被拒绝的单条记录
#[derive(Debug, Serialize)]
pub struct RejectedEntry {
    pub index: usize,
    pub name: String,
    pub code: &'static str,
    pub error: String,
}

/// `check-rules` 的输出
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub loaded: usize,
    pub rejected: Vec<RejectedEntry>,
}

/// 命令执行器
pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn compiler(&self) -> RuleCompiler {
        RuleCompiler::with_max_depth(self.config.rules.max_condition_depth)
    }

    /// 根据配置构建规则来源，`rules_file` 优先于配置
    pub fn build_source(&self, rules_file: Option<PathBuf>) -> Result<Arc<dyn RuleSource>> {
        let rules = &self.config.rules;
        let ttl = Duration::from_secs(rules.cache_ttl_seconds);

        if let Some(path) = rules_file {
            return Ok(with_cache(FileRuleSource::new(path, self.compiler()), ttl));
        }

        match rules.source {
            RuleSourceKind::File => {
                let path = rules
                    .rules_file
                    .clone()
                    .context("rules.source = file requires rules.rules_file")?;
                Ok(with_cache(FileRuleSource::new(path, self.compiler()), ttl))
            }
            RuleSourceKind::Database => {
                let database = Database::connect_lazy(&self.config.database)?;
                Ok(with_cache(
                    PgRuleSource::new(database.pool().clone(), self.compiler()),
                    ttl,
                ))
            }
        }
    }

    /// 执行 evaluate 命令
    pub async fn run_evaluate(
        &self,
        input: EvaluateInput,
        rules_file: Option<PathBuf>,
    ) -> Result<Decision> {
        let source = self.build_source(rules_file)?;
        let engine = ApprovalEngine::with_config(source, EngineConfig::from(&self.config.rules));

        let decision = match input {
            EvaluateInput::Facts(json) => {
                let facts = FactBag::from_json_str(&json).context("invalid --facts")?;
                engine.evaluate_request(&facts).await
            }
            EvaluateInput::Submission(args) => {
                let submission =
                    RequestSubmission::new(args.request_type, args.amount, args.reason);
                engine
                    .evaluate_submission(&submission, args.role)
                    .await
                    .context("invalid request")?
            }
        };

        print_json(&decision)?;
        Ok(decision)
    }

    /// 执行 check-rules 命令
    ///
    /// 存在被拒绝的规则时返回错误（非零退出码）。
    pub async fn run_check_rules(&self, file: &Path) -> Result<CheckReport> {
        let content = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        let records: Vec<Value> =
            serde_json::from_str(&content).context("rules file must be a JSON array")?;

        let report = self.compiler().compile_batch(records);
        let check = CheckReport {
            loaded: report.rules.len(),
            rejected: report
                .rejected
                .into_iter()
                .map(|r| RejectedEntry {
                    index: r.index,
                    name: r.name,
                    code: r.error.code(),
                    error: r.error.to_string(),
                })
                .collect(),
        };

        print_json(&check)?;
        info!(loaded = check.loaded, rejected = check.rejected.len(), "Rules checked");

        if !check.rejected.is_empty() {
            bail!("{} invalid rule records", check.rejected.len());
        }
        Ok(check)
    }

    /// 执行 defaults 命令
    pub fn run_defaults(&self) -> Result<()> {
        print_json(&default_rules())
    }
}

fn with_cache<S: RuleSource + 'static>(source: S, ttl: Duration) -> Arc<dyn RuleSource> {
    if ttl.is_zero() {
        Arc::new(source)
    } else {
        Arc::new(CachedRuleSource::new(source, ttl))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
