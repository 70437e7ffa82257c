//! Shared test utilities for `charity-hub`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        catalog::{self, NewProduct},
        donation::{self, NewDonation},
        help_request::{self, NewHelpRequest},
        user,
    },
    entities,
    errors::Result,
    notify::{self, EventSender},
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// An event sender whose receiver is already gone.
///
/// Emitting on it only logs, which is what seed helpers want.
pub fn test_events() -> EventSender {
    let (events, _rx) = notify::channel();
    events
}

/// Creates a test user with the given starting balance.
///
/// # Defaults
/// * `email`: `<name>@example.com`, lowercased with spaces removed
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    balance: i64,
) -> Result<entities::user::Model> {
    let email = format!("{}@example.com", name.replace(' ', "").to_lowercase());
    user::create_user(db, name.to_string(), email, balance).await
}

/// Creates a test product with the given price and no category.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
) -> Result<entities::product::Model> {
    catalog::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            price,
            ..Default::default()
        },
    )
    .await
}

/// Records a public donation from an existing user, crediting the fund.
pub async fn seed_donation(
    db: &DatabaseConnection,
    donor_id: i64,
    amount: i64,
) -> Result<entities::donation::Model> {
    let receipt = donation::record_donation(
        db,
        &test_events(),
        NewDonation {
            donor_id,
            amount: Some(amount),
            message: None,
            is_anonymous: false,
        },
    )
    .await?;
    Ok(receipt.donation)
}

/// Files a pending help request for an existing user.
///
/// # Defaults
/// * `reason`: `"Test request"`
/// * no phone or contact handle
pub async fn submit_test_request(
    db: &DatabaseConnection,
    user_id: i64,
    amount: i64,
) -> Result<entities::help_request::Model> {
    help_request::submit_help_request(
        db,
        &test_events(),
        NewHelpRequest {
            user_id,
            reason: Some("Test request".to_string()),
            amount: Some(amount),
            ..Default::default()
        },
    )
    .await
}
