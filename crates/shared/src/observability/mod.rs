//! 统一可观测性模块
//!
//! 所有入口通过单一函数初始化日志和指标，保证一致的指标命名。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus 指标，仅在启用时）
///
/// # Example
///
/// ```ignore
/// use approval_shared::config::AppConfig;
/// use approval_shared::observability;
///
/// let config = AppConfig::load("approval-rule-engine")?;
/// observability::init(&config.observability, &config.service_name)?;
/// ```
pub fn init(config: &ObservabilityConfig, service_name: &str) -> Result<()> {
    tracing::init(config)?;

    if config.metrics_enabled {
        metrics::init(config, service_name)?;
    }

    info!(
        service = %service_name,
        metrics_enabled = config.metrics_enabled,
        "Observability initialized"
    );

    Ok(())
}
