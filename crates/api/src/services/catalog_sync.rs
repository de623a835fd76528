//! Full catalog synchronization from the POS into the local store.
//!
//! Order of work: organizations, then each organization's nomenclature
//! (groups before products) with bounded parallelism across organizations,
//! then terminal groups and sections. Every step tolerates per-record and
//! per-organization failures and reports them instead of aborting the run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use domain::models::{Organization, ProductRecord, SectionRecord, TerminalGroupRecord};
use domain::services::{
    reconcile_flat, HierarchyReconciler, PosGateway, ReconcileCounts, RecordError,
};
use domain::store::{CatalogEntity, CatalogStore};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::middleware::metrics::record_sync_records;
use crate::services::pos_client::flatten_terminal_groups;

/// Tunables for a sync run.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub max_group_passes: usize,
    pub deactivate_missing: bool,
    pub organization_concurrency: usize,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_group_passes: config.max_group_passes,
            deactivate_missing: config.deactivate_missing,
            organization_concurrency: config.organization_concurrency,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

/// Which organizations to sync. `None` means every active organization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncScope {
    #[serde(default)]
    pub organization_ids: Option<Vec<String>>,
}

impl SyncScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn organizations(ids: Vec<String>) -> Self {
        Self {
            organization_ids: Some(ids),
        }
    }

    fn includes(&self, external_id: &str) -> bool {
        match &self.organization_ids {
            Some(ids) => ids.iter().any(|id| id == external_id),
            None => true,
        }
    }
}

/// A failure that stopped one part of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncError {
    /// What was being synced, e.g. `organizations` or `nomenclature:<org id>`.
    pub scope: String,
    pub message: String,
}

impl SyncError {
    fn new(scope: impl Into<String>, message: impl ToString) -> Self {
        Self {
            scope: scope.into(),
            message: message.to_string(),
        }
    }
}

/// Outcome of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub organizations_synced: usize,
    pub organizations: ReconcileCounts,
    pub groups: ReconcileCounts,
    pub products: ReconcileCounts,
    pub terminal_groups: ReconcileCounts,
    pub sections: ReconcileCounts,
    /// Rows deactivated because they disappeared from the feed.
    pub deactivated: u64,
    pub warnings: Vec<String>,
    pub record_errors: Vec<RecordError>,
    pub errors: Vec<SyncError>,
}

impl SyncReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            organizations_synced: 0,
            organizations: ReconcileCounts::default(),
            groups: ReconcileCounts::default(),
            products: ReconcileCounts::default(),
            terminal_groups: ReconcileCounts::default(),
            sections: ReconcileCounts::default(),
            deactivated: 0,
            warnings: Vec::new(),
            record_errors: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when nothing failed; warnings are allowed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.record_errors.is_empty()
    }

    fn total_created(&self) -> u64 {
        [
            self.organizations,
            self.groups,
            self.products,
            self.terminal_groups,
            self.sections,
        ]
        .iter()
        .map(|c| c.created)
        .sum()
    }
}

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum SyncRunError {
    #[error("A catalog sync is already running")]
    AlreadyRunning,
}

/// Result of syncing one organization's nomenclature.
#[derive(Default)]
struct OrganizationOutcome {
    groups: ReconcileCounts,
    products: ReconcileCounts,
    deactivated: u64,
    warnings: Vec<String>,
    record_errors: Vec<RecordError>,
    error: Option<SyncError>,
}

/// Runs catalog syncs. At most one run is active at a time.
pub struct CatalogSync {
    store: Arc<dyn CatalogStore>,
    gateway: Arc<dyn PosGateway>,
    settings: SyncSettings,
    running: Mutex<()>,
}

impl CatalogSync {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        gateway: Arc<dyn PosGateway>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
            running: Mutex::new(()),
        }
    }

    /// Run a full sync. Safe to repeat: a second run over unchanged remote
    /// data only updates.
    pub async fn run_full_sync(&self, scope: SyncScope) -> Result<SyncReport, SyncRunError> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| SyncRunError::AlreadyRunning)?;

        let start = Instant::now();
        let mut report = SyncReport::new();
        info!(scope = ?scope.organization_ids, "Catalog sync started");

        self.sync_organizations(&mut report).await;

        let targets = self.target_organizations(&scope, &mut report).await;
        report.organizations_synced = targets.len();

        self.sync_nomenclature(&targets, &mut report).await;
        self.sync_terminal_groups_and_sections(&targets, &mut report)
            .await;

        for (entity, counts) in [
            ("organization", &report.organizations),
            ("group", &report.groups),
            ("product", &report.products),
            ("terminal_group", &report.terminal_groups),
            ("section", &report.sections),
        ] {
            record_sync_records(entity, counts);
        }

        report.finished_at = Utc::now();
        info!(
            organizations = report.organizations_synced,
            created = report.total_created(),
            groups_written = report.groups.written(),
            products_written = report.products.written(),
            deactivated = report.deactivated,
            warnings = report.warnings.len(),
            errors = report.errors.len() + report.record_errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog sync finished"
        );

        Ok(report)
    }

    async fn sync_organizations(&self, report: &mut SyncReport) {
        let remote = match self.gateway.list_organizations().await {
            Ok(remote) => remote,
            Err(e) => {
                error!(error = %e, "Failed to fetch organizations, using stored ones");
                report.errors.push(SyncError::new("organizations", e));
                return;
            }
        };

        let records = remote.iter().map(|o| o.to_record()).collect();
        let store = self.store.clone();
        let outcome = reconcile_flat(
            "organization",
            records,
            |r| r.external_id.clone(),
            |r| {
                let store = store.clone();
                async move { store.upsert_organization(r).await }
            },
        )
        .await;

        report.organizations = outcome.counts;
        report.record_errors.extend(outcome.errors);
    }

    async fn target_organizations(
        &self,
        scope: &SyncScope,
        report: &mut SyncReport,
    ) -> Vec<Organization> {
        let organizations = match self.store.list_organizations(true).await {
            Ok(organizations) => organizations,
            Err(e) => {
                report.errors.push(SyncError::new("organizations", e));
                return Vec::new();
            }
        };

        if let Some(ids) = &scope.organization_ids {
            let known: HashSet<&str> = organizations
                .iter()
                .map(|o| o.external_id.as_str())
                .collect();
            for id in ids.iter().filter(|id| !known.contains(id.as_str())) {
                report
                    .warnings
                    .push(format!("organization {} is not known locally", id));
            }
        }

        organizations
            .into_iter()
            .filter(|o| o.pos_id().is_some() && scope.includes(&o.external_id))
            .collect()
    }

    async fn sync_nomenclature(&self, targets: &[Organization], report: &mut SyncReport) {
        let semaphore = Arc::new(Semaphore::new(self.settings.organization_concurrency.max(1)));
        let reconciler = HierarchyReconciler::new(self.settings.max_group_passes);
        let mut tasks = JoinSet::new();

        for organization in targets.iter().cloned() {
            let store = self.store.clone();
            let gateway = self.gateway.clone();
            let semaphore = semaphore.clone();
            let deactivate = self.settings.deactivate_missing;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                sync_organization_nomenclature(
                    store.as_ref(),
                    gateway.as_ref(),
                    reconciler,
                    deactivate,
                    &organization,
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.groups.merge(outcome.groups);
                    report.products.merge(outcome.products);
                    report.deactivated += outcome.deactivated;
                    report.warnings.extend(outcome.warnings);
                    report.record_errors.extend(outcome.record_errors);
                    report.errors.extend(outcome.error);
                }
                Err(e) => {
                    error!(error = %e, "Organization sync task panicked");
                    report.errors.push(SyncError::new("nomenclature", e));
                }
            }
        }
    }

    async fn sync_terminal_groups_and_sections(
        &self,
        targets: &[Organization],
        report: &mut SyncReport,
    ) {
        if targets.is_empty() {
            return;
        }

        let by_external: HashMap<&str, Uuid> = targets
            .iter()
            .map(|o| (o.external_id.as_str(), o.id))
            .collect();
        let organization_ids: Vec<String> =
            targets.iter().map(|o| o.external_id.clone()).collect();

        let buckets = match self.gateway.list_terminal_groups(&organization_ids).await {
            Ok(buckets) => buckets,
            Err(e) => {
                error!(error = %e, "Failed to fetch terminal groups");
                report.errors.push(SyncError::new("terminal_groups", e));
                return;
            }
        };

        let mut records = Vec::new();
        for (org_external_id, item) in flatten_terminal_groups(buckets) {
            match by_external.get(org_external_id.as_str()) {
                Some(&organization_id) => records.push(TerminalGroupRecord {
                    external_id: item.id,
                    organization_id,
                    name: item.name.unwrap_or_default(),
                }),
                None => {
                    warn!(
                        organization = %org_external_id,
                        terminal_group = %item.id,
                        "Terminal group for unknown organization skipped"
                    );
                    report.terminal_groups.skipped += 1;
                    report.warnings.push(format!(
                        "terminal group {} skipped, organization {} unknown",
                        item.id, org_external_id
                    ));
                }
            }
        }

        // Everything the feed lists counts as present, written or not.
        let present = present_by_organization(
            records
                .iter()
                .map(|r| (r.organization_id, r.external_id.clone())),
        );

        let store = self.store.clone();
        let outcome = reconcile_flat(
            CatalogEntity::TerminalGroup.as_str(),
            records,
            |r| r.external_id.clone(),
            |r| {
                let store = store.clone();
                async move { store.upsert_terminal_group(r).await }
            },
        )
        .await;
        report.terminal_groups.merge(outcome.counts);
        report.record_errors.extend(outcome.errors);

        let terminals: HashMap<String, (Uuid, Uuid)> = outcome
            .entities
            .iter()
            .map(|t| (t.external_id.clone(), (t.id, t.organization_id)))
            .collect();

        // Sections of a terminal group that failed to write are never
        // fetched, so their organization's sections are left alone.
        let incomplete: HashSet<Uuid> = present
            .iter()
            .filter(|(_, ids)| ids.iter().any(|id| !terminals.contains_key(id)))
            .map(|(organization_id, _)| *organization_id)
            .collect();

        if self.settings.deactivate_missing {
            let deactivated = self
                .deactivate_missing(CatalogEntity::TerminalGroup, targets, &present, report)
                .await;
            report.deactivated += deactivated;
        }

        self.sync_sections(targets, &terminals, &incomplete, report)
            .await;
    }

    async fn sync_sections(
        &self,
        targets: &[Organization],
        terminals: &HashMap<String, (Uuid, Uuid)>,
        incomplete: &HashSet<Uuid>,
        report: &mut SyncReport,
    ) {
        if terminals.is_empty() {
            return;
        }

        let terminal_ids: Vec<String> = terminals.keys().cloned().collect();
        let sections = match self.gateway.list_available_sections(&terminal_ids).await {
            Ok(sections) => sections,
            Err(e) => {
                error!(error = %e, "Failed to fetch restaurant sections");
                report.errors.push(SyncError::new("sections", e));
                return;
            }
        };

        let mut records = Vec::new();
        for section in sections {
            let Some(&(terminal_group_id, organization_id)) = section
                .terminal_group_id
                .as_deref()
                .and_then(|id| terminals.get(id))
            else {
                report.sections.skipped += 1;
                report.warnings.push(format!(
                    "section {} skipped, terminal group {} unknown",
                    section.id,
                    section.terminal_group_id.as_deref().unwrap_or("-")
                ));
                continue;
            };

            records.extend(section.slots().into_iter().map(|slot| SectionRecord {
                external_id: slot.external_id,
                organization_id,
                terminal_group_id: Some(terminal_group_id),
                name: slot.name,
                table_number: slot.table_number,
            }));
        }

        let present = present_by_organization(
            records
                .iter()
                .map(|r| (r.organization_id, r.external_id.clone())),
        );

        let store = self.store.clone();
        let outcome = reconcile_flat(
            CatalogEntity::Section.as_str(),
            records,
            |r| r.external_id.clone(),
            |r| {
                let store = store.clone();
                async move { store.upsert_section(r).await }
            },
        )
        .await;
        report.sections.merge(outcome.counts);
        report.record_errors.extend(outcome.errors);

        if self.settings.deactivate_missing {
            let complete: Vec<Organization> = targets
                .iter()
                .filter(|o| !incomplete.contains(&o.id))
                .cloned()
                .collect();
            let deactivated = self
                .deactivate_missing(CatalogEntity::Section, &complete, &present, report)
                .await;
            report.deactivated += deactivated;
        }
    }

    async fn deactivate_missing(
        &self,
        kind: CatalogEntity,
        targets: &[Organization],
        present: &HashMap<Uuid, Vec<String>>,
        report: &mut SyncReport,
    ) -> u64 {
        let mut total = 0;
        for organization in targets {
            let ids = present.get(&organization.id).map(Vec::as_slice).unwrap_or(&[]);
            match self
                .store
                .mark_missing_inactive(kind, organization.id, ids)
                .await
            {
                Ok(count) => total += count,
                Err(e) => report.errors.push(SyncError::new(
                    format!("deactivate:{}:{}", kind, organization.external_id),
                    e,
                )),
            }
        }
        total
    }
}

fn present_by_organization(
    pairs: impl Iterator<Item = (Uuid, String)>,
) -> HashMap<Uuid, Vec<String>> {
    let mut present: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (organization_id, external_id) in pairs {
        present.entry(organization_id).or_default().push(external_id);
    }
    present
}

/// Groups then products for one organization.
async fn sync_organization_nomenclature(
    store: &dyn CatalogStore,
    gateway: &dyn PosGateway,
    reconciler: HierarchyReconciler,
    deactivate: bool,
    organization: &Organization,
) -> OrganizationOutcome {
    let mut outcome = OrganizationOutcome::default();
    let Some(pos_id) = organization.pos_id() else {
        return outcome;
    };

    let nomenclature = match gateway.get_nomenclature(pos_id).await {
        Ok(nomenclature) => nomenclature,
        Err(e) => {
            error!(organization = %pos_id, error = %e, "Failed to fetch nomenclature");
            outcome.error = Some(SyncError::new(format!("nomenclature:{}", pos_id), e));
            return outcome;
        }
    };

    let hierarchy = reconciler
        .reconcile(store, organization.id, &nomenclature.groups)
        .await;
    outcome.groups = hierarchy.counts;
    outcome.warnings.extend(
        hierarchy
            .warnings
            .iter()
            .map(|w| format!("{}: {}", pos_id, w)),
    );
    outcome.record_errors.extend(hierarchy.errors);

    let mut records = Vec::new();
    for product in &nomenclature.products {
        if product.is_deleted() {
            outcome.products.skipped += 1;
            continue;
        }

        let group_id = match product.parent_id() {
            Some(parent) => {
                let mapped = hierarchy.mapping.get(parent).copied();
                if mapped.is_none() {
                    outcome.warnings.push(format!(
                        "{}: product {} references unsynced group {}",
                        pos_id, product.id, parent
                    ));
                }
                mapped
            }
            None => None,
        };

        records.push(ProductRecord {
            external_id: product.id.clone(),
            organization_id: organization.id,
            group_id,
            name: product.display_name(),
            description: product.display_description(),
            price: product.effective_price(),
            images: product.image_links.clone(),
        });
    }

    let products = reconcile_flat(
        CatalogEntity::Product.as_str(),
        records,
        |r| r.external_id.clone(),
        |r| store.upsert_product(r),
    )
    .await;
    outcome.products.merge(products.counts);
    outcome.record_errors.extend(products.errors);

    if deactivate {
        let live_groups: Vec<String> = nomenclature
            .groups
            .iter()
            .filter(|g| !g.is_deleted())
            .map(|g| g.id.clone())
            .collect();
        let live_products: Vec<String> = nomenclature
            .products
            .iter()
            .filter(|p| !p.is_deleted())
            .map(|p| p.id.clone())
            .collect();

        for (kind, ids) in [
            (CatalogEntity::Group, live_groups),
            (CatalogEntity::Product, live_products),
        ] {
            match store
                .mark_missing_inactive(kind, organization.id, &ids)
                .await
            {
                Ok(count) => outcome.deactivated += count,
                Err(e) => {
                    outcome.record_errors.push(RecordError::new(pos_id, e.to_string()));
                }
            }
        }
    }

    info!(
        organization = %pos_id,
        groups_written = outcome.groups.written(),
        products_written = outcome.products.written(),
        passes = hierarchy.passes,
        warnings = outcome.warnings.len(),
        "Organization nomenclature synced"
    );

    outcome
}
