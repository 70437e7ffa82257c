//! Catalog business logic - Products, comments, and ratings.
//!
//! A product's `rating` is the mean of every comment rating supplied so far.
//! It is recomputed in the same transaction that stores a rated comment.

use crate::{
    entities::{Product, ProductComment, product, product_comment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

/// Number of products returned by [`top_rated`] when no limit is given.
pub const DEFAULT_TOP_LIMIT: u64 = 10;

/// Highest price a catalog entry may carry.
pub const MAX_PRODUCT_PRICE: i64 = 1_000_000_000_000;

/// Input for a new catalog entry.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Price in whole currency units
    pub price: i64,
    /// Optional category
    pub category: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

/// Input for a new product comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    /// Author's user id, if known
    pub user_id: Option<i64>,
    /// Author name
    pub user_name: String,
    /// Review text
    pub text: String,
    /// Optional 1..=5 rating
    pub rating: Option<i32>,
}

/// Adds a product to the catalog.
#[instrument(skip(db))]
pub async fn create_product(db: &DatabaseConnection, input: NewProduct) -> Result<product::Model> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }
    if input.price < 0 {
        return Err(Error::validation("Product price cannot be negative"));
    }
    if input.price > MAX_PRODUCT_PRICE {
        return Err(Error::validation(format!(
            "Product price cannot exceed {MAX_PRODUCT_PRICE}"
        )));
    }

    let model = product::ActiveModel {
        name: Set(name),
        price: Set(input.price),
        category: Set(input.category.filter(|c| !c.trim().is_empty())),
        description: Set(input.description),
        rating: Set(0.0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Finds a product by id.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by id, failing with [`Error::ProductNotFound`] when absent.
pub async fn require_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    get_product_by_id(db, product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// Lists the whole catalog in creation order.
pub async fn list_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Best-rated products first.
pub async fn top_rated(db: &DatabaseConnection, limit: Option<u64>) -> Result<Vec<product::Model>> {
    let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_TOP_LIMIT);
    Product::find()
        .order_by_desc(product::Column::Rating)
        .order_by_asc(product::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Comments on a product, oldest first.
pub async fn comments_for_product(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<product_comment::Model>> {
    ProductComment::find()
        .filter(product_comment::Column::ProductId.eq(product_id))
        .order_by_asc(product_comment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every comment a user has written, newest first.
pub async fn comments_by_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<product_comment::Model>> {
    ProductComment::find()
        .filter(product_comment::Column::UserId.eq(user_id))
        .order_by_desc(product_comment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Mean of the supplied ratings, `None` if nothing was rated.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Stores a comment and refreshes the product's average rating.
#[instrument(skip(db, input))]
pub async fn add_comment(
    db: &DatabaseConnection,
    product_id: i64,
    input: NewComment,
) -> Result<product::Model> {
    if let Some(rating) = input.rating {
        if !(1..=5).contains(&rating) {
            return Err(Error::validation(format!(
                "Rating must be between 1 and 5, got {rating}"
            )));
        }
    }
    if input.text.trim().is_empty() && input.rating.is_none() {
        return Err(Error::validation("A comment needs text or a rating"));
    }

    let txn = db.begin().await?;

    let existing = require_product(&txn, product_id).await?;

    product_comment::ActiveModel {
        product_id: Set(product_id),
        user_id: Set(input.user_id),
        user_name: Set(input.user_name.trim().to_string()),
        text: Set(input.text.trim().to_string()),
        rating: Set(input.rating),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let ratings: Vec<i32> = ProductComment::find()
        .select_only()
        .column(product_comment::Column::Rating)
        .filter(product_comment::Column::ProductId.eq(product_id))
        .filter(product_comment::Column::Rating.is_not_null())
        .into_tuple::<Option<i32>>()
        .all(&txn)
        .await?
        .into_iter()
        .flatten()
        .collect();

    let updated = match average_rating(&ratings) {
        Some(rating) => {
            debug!("Product {} rating is now {:.2}", product_id, rating);
            let mut model: product::ActiveModel = existing.into();
            model.rating = Set(rating);
            model.update(&txn).await?
        }
        None => existing,
    };

    txn.commit().await?;
    Ok(updated)
}
