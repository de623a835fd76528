//! Connection pool gauges and a database round-trip probe.

use anyhow::Context;
use metrics::gauge;
use persistence::db;
use sqlx::PgPool;

use super::scheduler::{Job, JobFrequency};

const PROBE_INTERVAL_SECS: u64 = 15;

pub struct PoolMetricsJob {
    pool: PgPool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(PROBE_INTERVAL_SECS)
    }

    async fn execute(&self) -> anyhow::Result<()> {
        persistence::metrics::record_pool_metrics(&self.pool);

        let latency = db::ping(&self.pool)
            .await
            .context("database probe failed")?;
        gauge!("store_ping_seconds").set(latency.as_secs_f64());
        Ok(())
    }
}
