//! Help request entity - A user's ask for money from the charitable fund.
//!
//! Requests start `pending` and move exactly once to `rejected` or `completed`.
//! `active_slot` carries the requester's id while the request is active and is
//! cleared on the terminal transition; its UNIQUE index is what keeps a user
//! down to one active request at a time.

use sea_orm::ActiveValue;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Largest amount a single help request may ask for.
pub const MAX_HELP_REQUEST_AMOUNT: i64 = 50_000;

/// Lifecycle state of a help request
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum HelpStatus {
    /// Waiting for an admin decision
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted but not yet paid out. Approval pays out in the same
    /// transaction, so stored rows never keep this state.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined by an admin (terminal)
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Paid out to the requester (terminal)
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl HelpStatus {
    /// States that occupy the requester's single active slot.
    pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Approved];

    /// Whether the request can still be decided or paid out.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Lowercase name as stored and shown to users.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for HelpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HelpStatus {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            other => Err(crate::errors::Error::validation(format!(
                "Unknown help request status '{other}'"
            ))),
        }
    }
}

/// Help request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "help_requests")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requester
    pub user_id: i64,
    /// Requester name captured when the request was filed
    pub user_name: String,
    /// Requester email captured when the request was filed
    pub user_email: String,
    /// Optional phone number for follow-up
    pub phone: Option<String>,
    /// Optional chat handle for follow-up
    pub contact_handle: Option<String>,
    /// Why the money is needed
    pub reason: String,
    /// Requested amount, between 1 and [`MAX_HELP_REQUEST_AMOUNT`]
    pub amount: i64,
    /// Current lifecycle state
    pub status: HelpStatus,
    /// Admin who decided the request
    pub approved_by: Option<String>,
    /// When the decision was made (approval or rejection)
    pub approved_at: Option<DateTimeUtc>,
    /// When the money was credited to the requester
    pub completed_at: Option<DateTimeUtc>,
    /// Why the request was rejected
    pub rejection_reason: Option<String>,
    /// Requester id while the request is active, `None` once terminal
    #[sea_orm(unique)]
    #[serde(skip)]
    pub active_slot: Option<i64>,
    /// When the request was filed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between HelpRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request is filed by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Rejects any write that would persist an amount outside `1..=MAX_HELP_REQUEST_AMOUNT`.
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(amount) | ActiveValue::Unchanged(amount) = &self.amount {
            if *amount <= 0 || *amount > MAX_HELP_REQUEST_AMOUNT {
                return Err(DbErr::Custom(format!(
                    "help request amount {amount} outside 1..={MAX_HELP_REQUEST_AMOUNT}"
                )));
            }
        }
        Ok(self)
    }
}
