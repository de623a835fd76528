//! Product entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{LocalizedText, Product};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the products table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductEntity {
    pub id: Uuid,
    pub external_id: String,
    pub organization_id: Uuid,
    pub group_id: Option<Uuid>,
    pub name_uz: String,
    pub name_ru: String,
    pub name_en: String,
    pub description_uz: String,
    pub description_ru: String,
    pub description_en: String,
    pub price: Decimal,
    pub images: Json<Vec<String>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductEntity> for Product {
    fn from(entity: ProductEntity) -> Self {
        Self {
            id: entity.id,
            external_id: entity.external_id,
            organization_id: entity.organization_id,
            group_id: entity.group_id,
            name: LocalizedText {
                uz: entity.name_uz,
                ru: entity.name_ru,
                en: entity.name_en,
            },
            description: LocalizedText {
                uz: entity.description_uz,
                ru: entity.description_ru,
                en: entity.description_en,
            },
            price: entity.price,
            images: entity.images.0,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
