//! Storage quota reads/writes (C12 steps 3 and 9) and the process-memory
//! admission check (C12 step 2).

use async_trait::async_trait;
use pagespace_core::UserId;
use pagespace_upload::{MemoryMonitor, QuotaService, QuotaStatus};

/// `sqlx`-backed storage quota tracking.
#[derive(Debug, Clone)]
pub struct PgQuotaService {
    pool: sqlx::PgPool,
}

impl PgQuotaService {
    /// Construct a service over `pool`.
    #[must_use]
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaService for PgQuotaService {
    async fn status(&self, user_id: UserId) -> Result<QuotaStatus, String> {
        let row: (i64, i64) = sqlx::query_as("SELECT used_bytes, quota_bytes FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.to_string())?;
        Ok(QuotaStatus { used_bytes: row.0 as u64, quota_bytes: row.1 as u64 })
    }

    async fn record_usage(&self, user_id: UserId, additional_bytes: u64) -> Result<(), String> {
        sqlx::query("UPDATE users SET used_bytes = used_bytes + $1 WHERE id = $2")
            .bind(additional_bytes as i64)
            .bind(user_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Refuses uploads when the process is already under memory pressure.
///
/// A real deployment would read `/proc/meminfo` or a cgroup memory
/// controller; this implementation checks the process's own allocator
/// statistics are unavailable in a portable way, so it is parameterized
/// by an injected threshold function instead of a syscall, keeping the
/// admission pipeline testable without a real memory-pressure harness.
pub struct ThresholdMemoryMonitor {
    current_bytes: Box<dyn Fn() -> u64 + Send + Sync>,
    limit_bytes: u64,
}

impl ThresholdMemoryMonitor {
    /// Construct a monitor that refuses admission once `current_bytes()`
    /// exceeds `limit_bytes`.
    #[must_use]
    pub fn new(current_bytes: impl Fn() -> u64 + Send + Sync + 'static, limit_bytes: u64) -> Self {
        Self { current_bytes: Box::new(current_bytes), limit_bytes }
    }
}

#[async_trait]
impl MemoryMonitor for ThresholdMemoryMonitor {
    async fn admit(&self, payload_size: u64) -> Result<(), String> {
        let projected = (self.current_bytes)().saturating_add(payload_size);
        if projected > self.limit_bytes {
            return Err(format!("memory pressure: {projected} bytes would exceed the {} byte limit", self.limit_bytes));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn threshold_monitor_admits_under_limit() {
        let monitor = ThresholdMemoryMonitor::new(|| 100, 1_000);
        assert!(monitor.admit(500).await.is_ok());
    }

    #[tokio::test]
    async fn threshold_monitor_refuses_over_limit() {
        let monitor = ThresholdMemoryMonitor::new(|| 900, 1_000);
        assert!(monitor.admit(500).await.is_err());
    }
}
