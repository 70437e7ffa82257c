//! Donation entity - An immutable contribution to the charitable fund.
//!
//! `donor_name` is stored as `None` for anonymous donations; the donor id is
//! always kept so the donor's own history stays complete.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Donation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the donation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance funded the donation
    pub donor_id: i64,
    /// Donor display name, `None` when anonymous
    pub donor_name: Option<String>,
    /// Donated amount, always positive
    pub amount: i64,
    /// Optional note from the donor
    pub message: Option<String>,
    /// Whether the donor asked to stay anonymous
    pub is_anonymous: bool,
    /// When the donation was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Donation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each donation comes from one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DonorId",
        to = "super::user::Column::Id"
    )]
    Donor,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
