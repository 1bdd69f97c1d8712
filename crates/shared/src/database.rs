//! 数据库连接管理模块

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 延迟连接：首次查询时才建立连接，启动时数据库不可用也不会失败
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_lazy(&config.url)?;

        info!(
            max_connections = config.max_connections,
            "Database pool configured, connections are opened on first use"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_lazy_does_not_touch_database() {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            ..Default::default()
        };
        assert!(Database::connect_lazy(&config).is_ok());
    }

    #[test]
    fn test_connect_lazy_invalid_url() {
        let config = DatabaseConfig {
            url: "not a database url".to_string(),
            ..Default::default()
        };
        let err = Database::connect_lazy(&config).err().unwrap();
        assert_eq!(err.code(), "DATABASE_ERROR");
    }
}
