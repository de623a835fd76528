//! Background jobs.

mod catalog_sync;
mod pool_metrics;
mod scheduler;

pub use catalog_sync::CatalogSyncJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
