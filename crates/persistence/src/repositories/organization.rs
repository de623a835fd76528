//! Organization repository for database operations.

use domain::models::{Organization, OrganizationRecord};
use domain::store::Upserted;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{OrganizationEntity, UpsertRow};
use crate::metrics::QueryTimer;

/// Repository for organization database operations.
#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update an organization by its POS id.
    pub async fn upsert(
        &self,
        record: &OrganizationRecord,
    ) -> Result<Upserted<Organization>, sqlx::Error> {
        let timer = QueryTimer::new("organizations", "upsert");
        let row = sqlx::query_as::<_, UpsertRow<OrganizationEntity>>(
            r#"
            INSERT INTO organizations (external_id, name, country, restaurant_address, use_uae_addressing, timezone, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                country = EXCLUDED.country,
                restaurant_address = EXCLUDED.restaurant_address,
                use_uae_addressing = EXCLUDED.use_uae_addressing,
                timezone = EXCLUDED.timezone,
                is_active = TRUE
            RETURNING id, external_id, name, country, restaurant_address, use_uae_addressing, timezone,
                      is_active, created_at, updated_at, (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.external_id)
        .bind(&record.name)
        .bind(&record.country)
        .bind(&record.restaurant_address)
        .bind(record.use_uae_addressing)
        .bind(&record.timezone)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&row);

        let row = row?;
        Ok(Upserted {
            entity: row.entity.into(),
            created: row.inserted,
        })
    }

    /// Find organization by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrganizationEntity>(
            r#"
            SELECT id, external_id, name, country, restaurant_address, use_uae_addressing, timezone,
                   is_active, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Find organization by POS id.
    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Organization>, sqlx::Error> {
        let entity = sqlx::query_as::<_, OrganizationEntity>(
            r#"
            SELECT id, external_id, name, country, restaurant_address, use_uae_addressing, timezone,
                   is_active, created_at, updated_at
            FROM organizations
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// List organizations ordered by name.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Organization>, sqlx::Error> {
        let entities = sqlx::query_as::<_, OrganizationEntity>(
            r#"
            SELECT id, external_id, name, country, restaurant_address, use_uae_addressing, timezone,
                   is_active, created_at, updated_at
            FROM organizations
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY name, created_at
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }
}
