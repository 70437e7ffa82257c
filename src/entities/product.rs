//! Product entity - Catalog items that users can purchase with their balance.
//!
//! `rating` is derived from the comments and recomputed whenever a rated
//! comment is added.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product name shown in the catalog
    pub name: String,
    /// Price in whole currency units
    pub price: i64,
    /// Optional catalog category (e.g., "Electronics")
    pub category: Option<String>,
    /// Optional free-text description
    pub description: Option<String>,
    /// Mean of all comment ratings, 0 when nothing is rated yet
    pub rating: f64,
    /// When the product was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product has many comments
    #[sea_orm(has_many = "super::product_comment::Entity")]
    Comments,
}

impl Related<super::product_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
