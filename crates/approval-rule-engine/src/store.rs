//! 规则来源
//!
//! 引擎每次评估都通过 [`RuleSource`] 读取规则，保证规则修改在下一次请求即生效。
//! 具体实现：内存、JSON 文件、PostgreSQL。

use crate::compiler::RuleCompiler;
use crate::error::{Result, RuleError};
use crate::models::Rule;
use approval_shared::observability::metrics;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// 规则存储适配器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// 读取当前的规则集合
    async fn fetch_rules(&self) -> Result<Vec<Rule>>;
}

/// 内存规则来源
#[derive(Debug, Default)]
pub struct InMemoryRuleSource {
    rules: RwLock<Vec<Rule>>,
}

impl InMemoryRuleSource {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// 整体替换规则集合
    ///
    /// 名称为空白的规则（编辑器里新建但未填写的行）会被丢弃，返回实际保存的数量。
    pub fn replace(&self, rules: Vec<Rule>) -> usize {
        let kept: Vec<Rule> = rules
            .into_iter()
            .filter(|rule| !rule.name.trim().is_empty())
            .collect();
        let count = kept.len();
        *self.rules.write() = kept;
        info!("Rule set replaced: {} rules", count);
        count
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

#[async_trait]
impl RuleSource for InMemoryRuleSource {
    async fn fetch_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.read().clone())
    }
}

/// JSON 文件规则来源
///
/// 文件内容为规则记录数组，每次读取都重新加载文件。
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
    compiler: RuleCompiler,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>, compiler: RuleCompiler) -> Self {
        Self {
            path: path.into(),
            compiler,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleSource for FileRuleSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_rules(&self) -> Result<Vec<Rule>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<Value> = serde_json::from_str(&content)?;
        compile_records(&self.compiler, records)
    }
}

/// PostgreSQL 规则来源
///
/// 读取 `rules` 表，按优先级降序、id 升序排列，使同优先级的顺序是确定的。
#[derive(Clone)]
pub struct PgRuleSource {
    pool: PgPool,
    compiler: RuleCompiler,
}

/// 同优先级按 `rules.id` 原生类型排序（`id` 输出列是文本）
const SELECT_RULES_SQL: &str = r#"
    SELECT id::text AS id, name, priority::bigint AS priority, conditions, event
    FROM rules
    ORDER BY rules.priority DESC, rules.id ASC
"#;

/// 数据库规则行
#[derive(sqlx::FromRow)]
struct RuleRow {
    id: String,
    name: Option<String>,
    priority: Option<i64>,
    conditions: Option<Value>,
    event: Option<Value>,
}

impl RuleRow {
    fn into_record(self) -> Value {
        serde_json::json!({
            "name": self.name.unwrap_or_else(|| format!("rule_{}", self.id)),
            "priority": self.priority.unwrap_or(crate::compiler::DEFAULT_PRIORITY),
            "conditions": self.conditions.unwrap_or(Value::Null),
            "event": self.event.unwrap_or(Value::Null),
        })
    }
}

impl PgRuleSource {
    pub fn new(pool: PgPool, compiler: RuleCompiler) -> Self {
        Self { pool, compiler }
    }
}

#[async_trait]
impl RuleSource for PgRuleSource {
    #[instrument(skip(self))]
    async fn fetch_rules(&self) -> Result<Vec<Rule>> {
        let rows = sqlx::query_as::<_, RuleRow>(SELECT_RULES_SQL)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                RuleError::StoreUnavailable(e.to_string())
            }
            other => RuleError::Database(other),
        })?;

        debug!("Fetched {} rule rows", rows.len());
        let records = rows.into_iter().map(RuleRow::into_record).collect::<Vec<_>>();
        compile_records(&self.compiler, records)
    }
}

/// 编译规则记录
///
/// 任一记录格式错误时整个规则集合作废，返回 `INVALID_RULE`，由引擎回退到默认规则。
fn compile_records(compiler: &RuleCompiler, records: Vec<Value>) -> Result<Vec<Rule>> {
    let mut report = compiler.compile_batch(records);
    if report.is_clean() {
        return Ok(report.rules);
    }

    let rejected = report.rejected.len();
    warn!(
        "Rejected rule set: {} invalid rule records, {} valid records discarded",
        rejected,
        report.rules.len()
    );
    metrics::record_rule_rejected(rejected);

    let first = report.rejected.swap_remove(0);
    let total = rejected + report.rules.len();
    Err(RuleError::invalid_rule(
        first.name,
        format!("{} of {} stored records are invalid, first: {}", rejected, total, first.error),
    ))
}
