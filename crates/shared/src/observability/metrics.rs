//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 未安装 recorder 时所有记录函数都是空操作。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::config::ObservabilityConfig;

/// 安装 Prometheus recorder 并在指定端口暴露 `/metrics`
///
/// 需要在 Tokio runtime 内调用。
pub fn init(config: &ObservabilityConfig, service_name: &str) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service_name)
        .install()?;

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);

    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("rule_evaluations_total", "Total number of request evaluations");
    metrics::describe_histogram!(
        "rule_evaluation_duration_seconds",
        "Request evaluation duration in seconds, including the rule fetch"
    );
    metrics::describe_counter!(
        "rule_store_fallbacks_total",
        "Evaluations that fell back to the built-in default rules"
    );
    metrics::describe_counter!(
        "rule_records_rejected_total",
        "Stored rule records rejected at load time"
    );
}

/// 记录一次请求评估
#[inline]
pub fn record_rule_evaluation(status: &str, duration_secs: f64) {
    metrics::counter!(
        "rule_evaluations_total",
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "rule_evaluation_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration_secs);
}

/// 记录一次默认规则回退
#[inline]
pub fn record_store_fallback(reason: &str) {
    metrics::counter!(
        "rule_store_fallbacks_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录加载时被拒绝的规则记录
#[inline]
pub fn record_rule_rejected(count: usize) {
    metrics::counter!("rule_records_rejected_total").increment(count as u64);
}
