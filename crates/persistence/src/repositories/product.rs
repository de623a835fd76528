//! Product repository for database operations.

use domain::models::{Product, ProductRecord};
use domain::store::Upserted;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ProductEntity, UpsertRow};
use crate::metrics::QueryTimer;

/// Repository for product database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a product by its POS id.
    ///
    /// An empty incoming image list keeps the stored images.
    pub async fn upsert(&self, record: &ProductRecord) -> Result<Upserted<Product>, sqlx::Error> {
        let timer = QueryTimer::new("products", "upsert");
        let row = sqlx::query_as::<_, UpsertRow<ProductEntity>>(
            r#"
            INSERT INTO products (
                external_id, organization_id, group_id,
                name_uz, name_ru, name_en,
                description_uz, description_ru, description_en,
                price, images, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE)
            ON CONFLICT (external_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                group_id = EXCLUDED.group_id,
                name_uz = EXCLUDED.name_uz,
                name_ru = EXCLUDED.name_ru,
                name_en = EXCLUDED.name_en,
                description_uz = EXCLUDED.description_uz,
                description_ru = EXCLUDED.description_ru,
                description_en = EXCLUDED.description_en,
                price = EXCLUDED.price,
                images = CASE
                    WHEN jsonb_array_length(EXCLUDED.images) = 0 THEN products.images
                    ELSE EXCLUDED.images
                END,
                is_active = TRUE
            RETURNING id, external_id, organization_id, group_id,
                      name_uz, name_ru, name_en, description_uz, description_ru, description_en,
                      price, images, is_active, created_at, updated_at,
                      (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.external_id)
        .bind(record.organization_id)
        .bind(record.group_id)
        .bind(&record.name.uz)
        .bind(&record.name.ru)
        .bind(&record.name.en)
        .bind(&record.description.uz)
        .bind(&record.description.ru)
        .bind(&record.description.en)
        .bind(record.price)
        .bind(Json(&record.images))
        .fetch_one(&self.pool)
        .await;
        timer.finish(&row);

        let row = row?;
        Ok(Upserted {
            entity: row.entity.into(),
            created: row.inserted,
        })
    }

    /// Find product by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
        let entity = sqlx::query_as::<_, ProductEntity>(
            r#"
            SELECT id, external_id, organization_id, group_id,
                   name_uz, name_ru, name_en, description_uz, description_ru, description_en,
                   price, images, is_active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(Into::into))
    }

    /// Find every product whose ID is in `ids`. Unknown IDs are ignored.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let entities = sqlx::query_as::<_, ProductEntity>(
            r#"
            SELECT id, external_id, organization_id, group_id,
                   name_uz, name_ru, name_en, description_uz, description_ru, description_en,
                   price, images, is_active, created_at, updated_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }
}
