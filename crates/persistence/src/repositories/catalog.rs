//! Operations shared by every organization-scoped catalog table.

use domain::store::CatalogEntity;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::metrics::QueryTimer;

fn table_name(kind: CatalogEntity) -> &'static str {
    match kind {
        CatalogEntity::Group => "groups",
        CatalogEntity::Product => "products",
        CatalogEntity::TerminalGroup => "terminal_groups",
        CatalogEntity::Section => "sections",
    }
}

/// Repository for cross-table catalog maintenance.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deactivate active rows of `kind` in the organization whose POS id is
    /// not in `present`. Returns the number of rows changed.
    pub async fn mark_missing_inactive(
        &self,
        kind: CatalogEntity,
        organization_id: Uuid,
        present: &[String],
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new(table_name(kind), "mark_missing_inactive");
        let sql = format!(
            r#"
            UPDATE {}
            SET is_active = FALSE
            WHERE organization_id = $1
              AND is_active = TRUE
              AND NOT (external_id = ANY($2))
            "#,
            table_name(kind)
        );

        let result = sqlx::query(&sql)
            .bind(organization_id)
            .bind(present)
            .execute(&self.pool)
            .await;
        timer.finish(&result);

        let affected = result?.rows_affected();
        debug!(
            entity = kind.as_str(),
            organization_id = %organization_id,
            kept = present.len(),
            deactivated = affected,
            "Marked missing catalog rows inactive"
        );
        Ok(affected)
    }
}
