//! Scheduled full catalog sync.

use std::sync::Arc;

use tracing::{info, warn};

use super::scheduler::{Job, JobFrequency};
use crate::config::SyncConfig;
use crate::services::catalog_sync::{CatalogSync, SyncRunError, SyncScope};

pub struct CatalogSyncJob {
    sync: Arc<CatalogSync>,
    interval_minutes: u64,
    run_on_startup: bool,
}

impl CatalogSyncJob {
    pub fn new(sync: Arc<CatalogSync>, config: &SyncConfig) -> Self {
        Self {
            sync,
            interval_minutes: config.interval_minutes,
            run_on_startup: config.run_on_startup,
        }
    }
}

#[async_trait::async_trait]
impl Job for CatalogSyncJob {
    fn name(&self) -> &'static str {
        "catalog_sync"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    fn run_on_start(&self) -> bool {
        self.run_on_startup
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let report = match self.sync.run_full_sync(SyncScope::all()).await {
            Ok(report) => report,
            Err(SyncRunError::AlreadyRunning) => {
                info!("Catalog sync already running, skipping scheduled run");
                return Ok(());
            }
        };

        if !report.record_errors.is_empty() {
            warn!(
                failed_records = report.record_errors.len(),
                "Catalog sync finished with record failures"
            );
        }

        if !report.errors.is_empty() {
            let scopes: Vec<&str> = report.errors.iter().map(|e| e.scope.as_str()).collect();
            anyhow::bail!("catalog sync failed for: {}", scopes.join(", "));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog_sync::SyncSettings;
    use domain::services::{MockPosGateway, PosError, RemoteOrganization};
    use domain::store::InMemoryStore;

    fn job(gateway: MockPosGateway) -> CatalogSyncJob {
        let sync = CatalogSync::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(gateway),
            SyncSettings::default(),
        );
        CatalogSyncJob::new(
            Arc::new(sync),
            &SyncConfig {
                interval_minutes: 30,
                run_on_startup: true,
                ..SyncConfig::default()
            },
        )
    }

    #[test]
    fn test_schedule_follows_config() {
        let job = job(MockPosGateway::new());
        assert_eq!(job.frequency(), JobFrequency::Minutes(30));
        assert!(job.run_on_start());
        assert_eq!(job.name(), "catalog_sync");
    }

    #[tokio::test]
    async fn test_successful_sync() {
        let gateway = MockPosGateway::new().with_organizations(vec![RemoteOrganization {
            id: "org-1".to_string(),
            ..Default::default()
        }]);
        tokio_test::assert_ok!(job(gateway).execute().await);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_the_run() {
        let gateway = MockPosGateway::new()
            .failing("list_organizations", PosError::Auth("bad login".to_string()));
        let error = job(gateway).execute().await.unwrap_err();
        assert!(error.to_string().contains("organizations"));
    }
}
