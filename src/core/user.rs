//! User business logic - Accounts, balances, and notification channels.
//!
//! Balances are only ever moved with single conditional UPDATE statements
//! (`balance = balance + delta`), mirroring how the fund ledger is handled, so
//! concurrent purchases or donations cannot lose updates or overdraw.

use crate::{
    entities::{Purchase, PurchaseItem, User, purchase, purchase_item, user},
    errors::{Error, Result, is_unique_violation},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// A purchase together with its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// The purchase header
    #[serde(flatten)]
    pub purchase: purchase::Model,
    /// Items bought, in the order they were requested
    pub products: Vec<purchase_item::Model>,
}

/// A user's purchase history as shown on their profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseHistory {
    /// Name of the user
    pub user_name: String,
    /// Balance right now
    pub current_balance: i64,
    /// Purchases, newest first
    pub purchase_history: Vec<PurchaseRecord>,
}

/// Creates a new user with a starting balance.
///
/// The name must not be blank, the email must look like an email, and the
/// starting balance must not be negative. Emails are unique.
#[instrument(skip(db))]
pub async fn create_user(
    db: &DatabaseConnection,
    name: String,
    email: String,
    initial_balance: i64,
) -> Result<user::Model> {
    let name = name.trim().to_string();
    let email = email.trim().to_lowercase();

    if name.is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation(format!("'{email}' is not a valid email")));
    }
    if initial_balance < 0 {
        return Err(Error::validation("Starting balance cannot be negative"));
    }

    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::conflict(format!(
            "A user with email '{email}' already exists"
        )));
    }

    let model = user::ActiveModel {
        name: Set(name),
        email: Set(email.clone()),
        balance: Set(initial_balance),
        total_donated: Set(0),
        notification_channel: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(format!("A user with email '{email}' already exists"))
        } else {
            e.into()
        }
    })?;

    info!("Created user {} ({})", created.id, created.email);
    Ok(created)
}

/// Finds a user by id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by id, failing with [`Error::UserNotFound`] when absent.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })
}

/// Finds a user by (normalised) email.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all users in creation order.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Attaches a chat channel that notifications for this user should go to.
///
/// Linking the same channel again is a no-op. A user already linked to a
/// different channel keeps it and the call fails with [`Error::Conflict`].
#[instrument(skip(db))]
pub async fn link_notification_channel(
    db: &DatabaseConnection,
    user_id: i64,
    channel: String,
) -> Result<user::Model> {
    let channel = channel.trim().to_string();
    if channel.is_empty() {
        return Err(Error::validation("Notification channel cannot be empty"));
    }

    let existing = require_user(db, user_id).await?;
    match existing.notification_channel.as_deref() {
        Some(current) if current == channel => return Ok(existing),
        Some(_) => {
            warn!(
                "Refused to replace the notification channel of user {}",
                user_id
            );
            return Err(Error::conflict(format!(
                "User {user_id} already has a notification channel linked"
            )));
        }
        None => {}
    }

    let mut model: user::ActiveModel = existing.into();
    model.notification_channel = Set(Some(channel));
    let updated = model.update(db).await?;

    info!("Linked notification channel for user {}", user_id);
    Ok(updated)
}

/// Atomically adds `amount` to a user's balance.
pub async fn credit_balance<C>(db: &C, user_id: i64, amount: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let result = User::update_many()
        .col_expr(
            user::Column::Balance,
            Expr::col(user::Column::Balance).add(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::UserNotFound { id: user_id });
    }
    require_user(db, user_id).await
}

/// Atomically subtracts `amount` from a user's balance if the balance covers it.
///
/// When `count_as_donation` is set the same statement also raises
/// `total_donated`, so the two can never disagree.
pub async fn debit_balance<C>(
    db: &C,
    user_id: i64,
    amount: i64,
    count_as_donation: bool,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if amount < 0 {
        return Err(Error::validation("Debit amount cannot be negative"));
    }

    let mut update = User::update_many().col_expr(
        user::Column::Balance,
        Expr::col(user::Column::Balance).sub(amount),
    );
    if count_as_donation {
        update = update.col_expr(
            user::Column::TotalDonated,
            Expr::col(user::Column::TotalDonated).add(amount),
        );
    }

    let result = update
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::Balance.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let current = require_user(db, user_id).await?;
        return Err(Error::InsufficientFunds {
            available: current.balance,
            required: amount,
        });
    }
    require_user(db, user_id).await
}

/// Returns a user's purchases with their items, newest first.
pub async fn purchase_history(db: &DatabaseConnection, user_id: i64) -> Result<PurchaseHistory> {
    let owner = require_user(db, user_id).await?;

    let purchases = Purchase::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .order_by_desc(purchase::Column::CreatedAt)
        .order_by_desc(purchase::Column::Id)
        .all(db)
        .await?;

    let mut items = PurchaseItem::find()
        .filter(purchase_item::Column::PurchaseId.is_in(purchases.iter().map(|p| p.id)))
        .order_by_asc(purchase_item::Column::Id)
        .all(db)
        .await?;

    let purchase_history = purchases
        .into_iter()
        .map(|purchase| {
            let (products, rest): (Vec<_>, Vec<_>) = items
                .drain(..)
                .partition(|item| item.purchase_id == purchase.id);
            items = rest;
            PurchaseRecord { purchase, products }
        })
        .collect();

    Ok(PurchaseHistory {
        user_name: owner.name,
        current_balance: owner.balance,
        purchase_history,
    })
}
