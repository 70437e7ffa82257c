//! Purchase business logic - Buying catalog products with a user's balance.
//!
//! The balance debit, the purchase header, and its line items are written in
//! one transaction; a short balance rolls everything back and surfaces as
//! [`Error::InsufficientFunds`].

use crate::{
    core::{catalog, user as users},
    entities::{purchase, purchase_item},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Outcome of a successful purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Stored purchase header
    pub purchase: purchase::Model,
    /// Amount charged
    pub total_price: i64,
    /// Buyer's balance after the charge
    pub remaining_balance: i64,
    /// Names of the products bought, in request order
    pub purchased_products: Vec<String>,
}

/// Charges a user for the given products and records the purchase.
///
/// Every id must resolve; an id listed twice buys the product twice.
#[instrument(skip(db))]
pub async fn purchase(
    db: &DatabaseConnection,
    user_id: i64,
    product_ids: &[i64],
) -> Result<PurchaseReceipt> {
    if product_ids.is_empty() {
        return Err(Error::validation("At least one product is required"));
    }

    let txn = db.begin().await?;

    users::require_user(&txn, user_id).await?;

    let mut products = Vec::with_capacity(product_ids.len());
    for &product_id in product_ids {
        products.push(catalog::require_product(&txn, product_id).await?);
    }
    let total_price = products
        .iter()
        .try_fold(0_i64, |total, p| total.checked_add(p.price))
        .ok_or_else(|| Error::validation("Purchase total is too large"))?;

    let buyer = users::debit_balance(&txn, user_id, total_price, false).await?;

    let purchase = purchase::ActiveModel {
        user_id: Set(user_id),
        total_price: Set(total_price),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for product in &products {
        purchase_item::ActiveModel {
            purchase_id: Set(purchase.id),
            product_id: Set(product.id),
            name: Set(product.name.clone()),
            price: Set(product.price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(
        "User {} bought {} product(s) for {}",
        user_id,
        products.len(),
        total_price
    );

    Ok(PurchaseReceipt {
        purchase,
        total_price,
        remaining_balance: buyer.balance,
        purchased_products: products.into_iter().map(|p| p.name).collect(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::purchase_history;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_purchase_debits_balance_and_records_history() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "Ivan", 10_000).await?;
        let laptop = create_test_product(&db, "Laptop", 6_000).await?;
        let mouse = create_test_product(&db, "Mouse", 500).await?;

        let receipt = purchase(&db, buyer.id, &[laptop.id, mouse.id, mouse.id]).await?;
        assert_eq!(receipt.total_price, 7_000);
        assert_eq!(receipt.remaining_balance, 3_000);
        assert_eq!(receipt.purchased_products, vec!["Laptop", "Mouse", "Mouse"]);

        let history = purchase_history(&db, buyer.id).await?;
        assert_eq!(history.current_balance, 3_000);
        assert_eq!(history.purchase_history.len(), 1);
        let items = &history.purchase_history[0].products;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].name, "Laptop");
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_total_overflow_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "Ivan", 10).await?;
        // Written directly so the catalog price ceiling does not apply.
        let yacht = crate::entities::product::ActiveModel {
            name: Set("Yacht".to_string()),
            price: Set(i64::MAX),
            rating: Set(0.0),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let result = purchase(&db, buyer.id, &[yacht.id, yacht.id]).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let after = crate::core::user::require_user(&db, buyer.id).await?;
        assert_eq!(after.balance, 10);
        assert!(purchase_history(&db, buyer.id).await?.purchase_history.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_with_short_balance_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "Ivan", 1_000).await?;
        let laptop = create_test_product(&db, "Laptop", 6_000).await?;

        let result = purchase(&db, buyer.id, &[laptop.id]).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds {
                available: 1_000,
                required: 6_000
            }
        ));

        let history = purchase_history(&db, buyer.id).await?;
        assert_eq!(history.current_balance, 1_000);
        assert!(history.purchase_history.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_unknown_entities() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "Ivan", 1_000).await?;
        let mouse = create_test_product(&db, "Mouse", 500).await?;

        let result = purchase(&db, 999, &[mouse.id]).await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { id: 999 }));

        let result = purchase(&db, buyer.id, &[mouse.id, 404]).await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { id: 404 }));

        let result = purchase(&db, buyer.id, &[]).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }
}
