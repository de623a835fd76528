//! Terminal group and section repositories.

use domain::models::{Section, SectionRecord, TerminalGroup, TerminalGroupRecord};
use domain::store::Upserted;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{SectionEntity, TerminalGroupEntity, UpsertRow};
use crate::metrics::QueryTimer;

/// Repository for terminal group database operations.
#[derive(Clone)]
pub struct TerminalGroupRepository {
    pool: PgPool,
}

impl TerminalGroupRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a terminal group by its POS id.
    pub async fn upsert(
        &self,
        record: &TerminalGroupRecord,
    ) -> Result<Upserted<TerminalGroup>, sqlx::Error> {
        let timer = QueryTimer::new("terminal_groups", "upsert");
        let row = sqlx::query_as::<_, UpsertRow<TerminalGroupEntity>>(
            r#"
            INSERT INTO terminal_groups (external_id, organization_id, name, is_active)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (external_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                name = EXCLUDED.name,
                is_active = TRUE
            RETURNING id, external_id, organization_id, name, is_active, created_at, updated_at,
                      (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.external_id)
        .bind(record.organization_id)
        .bind(&record.name)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&row);

        let row = row?;
        Ok(Upserted {
            entity: row.entity.into(),
            created: row.inserted,
        })
    }

    /// List terminal groups of an organization, oldest first.
    pub async fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<TerminalGroup>, sqlx::Error> {
        let entities = sqlx::query_as::<_, TerminalGroupEntity>(
            r#"
            SELECT id, external_id, organization_id, name, is_active, created_at, updated_at
            FROM terminal_groups
            WHERE organization_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Oldest active terminal group of an organization.
    pub async fn first_active(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<TerminalGroup>, sqlx::Error> {
        let entity = sqlx::query_as::<_, TerminalGroupEntity>(
            r#"
            SELECT id, external_id, organization_id, name, is_active, created_at, updated_at
            FROM terminal_groups
            WHERE organization_id = $1 AND is_active = TRUE
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }
}

/// Repository for section (table) database operations.
#[derive(Clone)]
pub struct SectionRepository {
    pool: PgPool,
}

impl SectionRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a section by its POS id.
    pub async fn upsert(&self, record: &SectionRecord) -> Result<Upserted<Section>, sqlx::Error> {
        let timer = QueryTimer::new("sections", "upsert");
        let row = sqlx::query_as::<_, UpsertRow<SectionEntity>>(
            r#"
            INSERT INTO sections (external_id, organization_id, terminal_group_id, name, table_number, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (external_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                terminal_group_id = EXCLUDED.terminal_group_id,
                name = EXCLUDED.name,
                table_number = EXCLUDED.table_number,
                is_active = TRUE
            RETURNING id, external_id, organization_id, terminal_group_id, name, table_number,
                      is_active, created_at, updated_at, (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.external_id)
        .bind(record.organization_id)
        .bind(record.terminal_group_id)
        .bind(&record.name)
        .bind(record.table_number)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&row);

        let row = row?;
        Ok(Upserted {
            entity: row.entity.into(),
            created: row.inserted,
        })
    }
}
