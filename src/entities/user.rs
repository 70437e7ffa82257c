//! User entity - Represents an account holding a monetary balance.
//!
//! The balance is set when the account is created and afterwards only moves
//! through purchases, donations, and approved help requests. `total_donated`
//! never decreases.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact email, unique across all users
    #[sea_orm(unique)]
    pub email: String,
    /// Spendable balance in whole currency units, never negative
    pub balance: i64,
    /// Running total of everything this user has donated
    pub total_donated: i64,
    /// Chat channel id used for notifications, if the user linked one
    pub notification_channel: Option<String>,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many purchases
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchases,
    /// One user makes many donations
    #[sea_orm(has_many = "super::donation::Entity")]
    Donations,
    /// One user files many help requests over time
    #[sea_orm(has_many = "super::help_request::Entity")]
    HelpRequests,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl Related<super::help_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HelpRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
