//! Store query timings and pool gauges.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Times one store statement, labelled by table and operation.
///
/// ```ignore
/// let timer = QueryTimer::new("products", "upsert");
/// let row = sqlx::query_as::<_, ProductEntity>(...).fetch_one(&pool).await;
/// timer.finish(&row);
/// ```
pub struct QueryTimer {
    table: &'static str,
    operation: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(table: &'static str, operation: &'static str) -> Self {
        Self {
            table,
            operation,
            start: Instant::now(),
        }
    }

    /// Record the elapsed time with the statement outcome.
    pub fn finish<T>(self, result: &Result<T, sqlx::Error>) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        if result.is_err() {
            counter!(
                "store_query_errors_total",
                "table" => self.table,
                "operation" => self.operation
            )
            .increment(1);
        }
        self.observe(outcome);
    }

    /// Record a multi-statement operation that reached its commit.
    pub fn committed(self) {
        self.observe("ok");
    }

    fn observe(self, outcome: &'static str) {
        histogram!(
            "store_query_duration_seconds",
            "table" => self.table,
            "operation" => self.operation,
            "outcome" => outcome
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}

/// Publish pool occupancy gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("store_pool_connections", "state" => "busy").set(size.saturating_sub(idle) as f64);
    gauge!("store_pool_connections", "state" => "idle").set(idle as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_keeps_labels() {
        let timer = QueryTimer::new("sections", "upsert");
        assert_eq!(timer.table, "sections");
        assert_eq!(timer.operation, "upsert");
    }

    #[test]
    fn test_finish_without_recorder_is_harmless() {
        let ok: Result<u64, sqlx::Error> = Ok(3);
        QueryTimer::new("products", "mark_missing_inactive").finish(&ok);

        let failed: Result<u64, sqlx::Error> = Err(sqlx::Error::RowNotFound);
        QueryTimer::new("products", "mark_missing_inactive").finish(&failed);
    }
}
