//! Menu group repository for database operations.

use domain::models::{Group, GroupRecord};
use domain::store::Upserted;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, UpsertRow};
use crate::metrics::QueryTimer;

/// Repository for menu group database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a group by its POS id. Reactivates the row.
    pub async fn upsert(&self, record: &GroupRecord) -> Result<Upserted<Group>, sqlx::Error> {
        let timer = QueryTimer::new("groups", "upsert");
        let row = sqlx::query_as::<_, UpsertRow<GroupEntity>>(
            r#"
            INSERT INTO groups (
                external_id, organization_id, parent_group_id,
                name_uz, name_ru, name_en,
                description_uz, description_ru, description_en,
                display_order, is_included_in_menu, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE)
            ON CONFLICT (external_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                parent_group_id = EXCLUDED.parent_group_id,
                name_uz = EXCLUDED.name_uz,
                name_ru = EXCLUDED.name_ru,
                name_en = EXCLUDED.name_en,
                description_uz = EXCLUDED.description_uz,
                description_ru = EXCLUDED.description_ru,
                description_en = EXCLUDED.description_en,
                display_order = EXCLUDED.display_order,
                is_included_in_menu = EXCLUDED.is_included_in_menu,
                is_active = TRUE
            RETURNING id, external_id, organization_id, parent_group_id,
                      name_uz, name_ru, name_en, description_uz, description_ru, description_en,
                      display_order, is_included_in_menu, is_active, created_at, updated_at,
                      (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.external_id)
        .bind(record.organization_id)
        .bind(record.parent_group_id)
        .bind(&record.name.uz)
        .bind(&record.name.ru)
        .bind(&record.name.en)
        .bind(&record.description.uz)
        .bind(&record.description.ru)
        .bind(&record.description.en)
        .bind(record.display_order)
        .bind(record.is_included_in_menu)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&row);

        let row = row?;
        Ok(Upserted {
            entity: row.entity.into(),
            created: row.inserted,
        })
    }

    /// List groups of an organization in menu order.
    pub async fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Group>, sqlx::Error> {
        let entities = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, external_id, organization_id, parent_group_id,
                   name_uz, name_ru, name_en, description_uz, description_ru, description_en,
                   display_order, is_included_in_menu, is_active, created_at, updated_at
            FROM groups
            WHERE organization_id = $1
            ORDER BY display_order, name_ru
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }
}
