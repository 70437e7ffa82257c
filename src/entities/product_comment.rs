//! Product comment entity - A review left on a product, optionally rated 1 to 5.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product comment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_comments")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the comment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product being reviewed
    pub product_id: i64,
    /// Author's user id, if the author has an account
    pub user_id: Option<i64>,
    /// Author name as given with the comment
    pub user_name: String,
    /// Review text
    pub text: String,
    /// Optional star rating between 1 and 5
    pub rating: Option<i32>,
    /// When the comment was posted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between comments and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each comment belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
