//! 规则缓存
//!
//! 可选的 [`RuleSource`] 装饰器，由调用方显式注入。规则被编辑后调用
//! [`CachedRuleSource::invalidate`]，下一次请求即读取最新规则。
//!
//! ## 缓存刷新策略
//!
//! TTL 过期后刷新；刷新失败时若存在旧缓存则继续使用旧缓存，否则把错误交给调用方。

use crate::error::Result;
use crate::models::Rule;
use crate::store::RuleSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct CachedRules {
    rules: Arc<Vec<Rule>>,
    loaded_at: Instant,
}

/// 带 TTL 的规则缓存
pub struct CachedRuleSource<S> {
    inner: S,
    ttl: Duration,
    state: RwLock<Option<CachedRules>>,
}

impl<S: RuleSource> CachedRuleSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: RwLock::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// 使缓存失效（规则变更时调用）
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
        info!("Rule cache invalidated");
    }

    /// 缓存是否仍在有效期内
    pub async fn is_fresh(&self) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .is_some_and(|cached| cached.loaded_at.elapsed() < self.ttl)
    }

    async fn refresh(&self) -> Result<Arc<Vec<Rule>>> {
        let mut state = self.state.write().await;

        // 等待写锁期间可能已被其他请求刷新
        if let Some(cached) = state.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.rules.clone());
            }
        }

        match self.inner.fetch_rules().await {
            Ok(rules) => {
                let rules = Arc::new(rules);
                debug!("Rule cache refreshed: {} rules", rules.len());
                *state = Some(CachedRules {
                    rules: rules.clone(),
                    loaded_at: Instant::now(),
                });
                Ok(rules)
            }
            Err(e) => match state.as_ref() {
                Some(stale) => {
                    warn!(code = e.code(), error = %e, "Rule cache refresh failed, serving stale rules");
                    Ok(stale.rules.clone())
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl<S: RuleSource> RuleSource for CachedRuleSource<S> {
    async fn fetch_rules(&self) -> Result<Vec<Rule>> {
        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref() {
                if cached.loaded_at.elapsed() < self.ttl {
                    return Ok(cached.rules.as_ref().clone());
                }
            }
        }

        let rules = self.refresh().await?;
        Ok(rules.as_ref().clone())
    }
}
