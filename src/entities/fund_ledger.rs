//! Fund ledger entity - Single-row running totals of the charitable fund.
//!
//! The row is credited in the same transaction as every donation and debited
//! in the same transaction as every completed help request, so `available`
//! always equals donations minus disbursements.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the one and only ledger row.
pub const LEDGER_ID: i32 = 1;

/// Fund ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fund_ledger")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Always [`LEDGER_ID`]
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip)]
    pub id: i32,
    /// Sum of all donations ever made
    pub total_donated: i64,
    /// Sum of all completed help requests
    pub total_disbursed: i64,
    /// Money that can still be disbursed
    pub available: i64,
    /// When the ledger last moved
    pub updated_at: DateTimeUtc,
}

/// The ledger has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
