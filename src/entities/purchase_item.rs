//! Purchase item entity - Snapshot of a product's name and price inside a purchase.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_items")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Purchase this item belongs to
    pub purchase_id: i64,
    /// Product that was bought
    pub product_id: i64,
    /// Product name at the time of purchase
    pub name: String,
    /// Product price at the time of purchase
    pub price: i64,
}

/// Defines relationships between line items and purchases
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id"
    )]
    Purchase,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
