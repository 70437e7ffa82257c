//! Donation business logic - Moving money from a user's balance into the charitable fund.
//!
//! A donation debits the donor, raises their `total_donated`, stores an
//! immutable donation row, and credits the fund ledger, all in one
//! transaction. Once committed a `DonationRecorded` event tells the donor
//! thanks and, when help requests are waiting, lets the admins know new money
//! is available. The event is advisory; nothing is approved automatically.

use crate::{
    core::{ledger, user as users},
    entities::{Donation, HelpRequest, HelpStatus, donation, help_request},
    errors::{Error, Result},
    notify::{DomainEvent, EventSender},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// How many donors [`donation_stats`] ranks.
pub const TOP_DONOR_LIMIT: usize = 5;
/// How many donations [`donation_stats`] lists as recent.
pub const RECENT_DONATION_LIMIT: u64 = 10;

/// Input for a new donation.
#[derive(Debug, Clone, Default)]
pub struct NewDonation {
    /// Donor's user id
    pub donor_id: i64,
    /// Amount to donate; `None` when the caller left it out
    pub amount: Option<i64>,
    /// Optional note
    pub message: Option<String>,
    /// Hide the donor's name from public listings
    pub is_anonymous: bool,
}

/// Outcome of a successful donation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    /// The stored donation
    pub donation: donation::Model,
    /// Donor's balance after the debit
    pub remaining_balance: i64,
    /// Donor's lifetime donations including this one
    pub total_donated: i64,
}

/// A donor's position in the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDonor {
    /// Donor's user id
    pub donor_id: i64,
    /// Donor's display name
    pub donor_name: String,
    /// Sum of the donor's public donations
    pub total_amount: i64,
    /// Number of public donations
    pub donation_count: usize,
}

/// Pool-wide donation statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationStats {
    /// Sum of every donation
    pub total_amount: i64,
    /// Number of donations
    pub total_count: u64,
    /// Biggest public donors
    pub top_donors: Vec<TopDonor>,
    /// Latest donations, newest first
    pub recent_donations: Vec<donation::Model>,
}

/// Records a donation from a user's balance into the fund.
#[instrument(skip(db, events))]
pub async fn record_donation(
    db: &DatabaseConnection,
    events: &EventSender,
    input: NewDonation,
) -> Result<DonationReceipt> {
    let amount = input
        .amount
        .ok_or_else(|| Error::validation("Donation amount is required"))?;
    if amount <= 0 {
        return Err(Error::validation("Donation amount must be greater than zero"));
    }

    let txn = db.begin().await?;

    let donor = users::get_user_by_id(&txn, input.donor_id)
        .await?
        .ok_or_else(|| Error::validation(format!("Donor {} does not exist", input.donor_id)))?;

    let donor_after = users::debit_balance(&txn, donor.id, amount, true).await?;

    let message = input.message.filter(|m| !m.trim().is_empty());
    let donation = donation::ActiveModel {
        donor_id: Set(donor.id),
        donor_name: Set((!input.is_anonymous).then(|| donor.name.clone())),
        amount: Set(amount),
        message: Set(message),
        is_anonymous: Set(input.is_anonymous),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    ledger::record_inflow(&txn, amount).await?;
    let fund = ledger::get_ledger(&txn).await?;

    let pending_requests = HelpRequest::find()
        .filter(help_request::Column::Status.eq(HelpStatus::Pending))
        .count(&txn)
        .await?;

    txn.commit().await?;

    info!(
        "Donation {} of {} from user {} recorded; fund now {}",
        donation.id, amount, donor.id, fund.available
    );

    events.emit(DomainEvent::DonationRecorded {
        donation: donation.clone(),
        donor_channel: donor.notification_channel,
        pending_requests,
        fund_available: fund.available,
    });

    Ok(DonationReceipt {
        donation,
        remaining_balance: donor_after.balance,
        total_donated: donor_after.total_donated,
    })
}

/// A user's donations, newest first.
pub async fn donations_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<donation::Model>> {
    users::require_user(db, user_id).await?;
    Donation::find()
        .filter(donation::Column::DonorId.eq(user_id))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Ranks donors by their summed public donations. Ties keep first-seen order.
#[must_use]
pub fn rank_donors(donations: &[donation::Model], limit: usize) -> Vec<TopDonor> {
    let mut by_donor: HashMap<i64, usize> = HashMap::new();
    let mut ranked: Vec<TopDonor> = Vec::new();

    for donation in donations.iter().filter(|d| !d.is_anonymous) {
        let Some(name) = donation.donor_name.as_ref() else {
            continue;
        };
        if let Some(&slot) = by_donor.get(&donation.donor_id) {
            ranked[slot].total_amount += donation.amount;
            ranked[slot].donation_count += 1;
        } else {
            by_donor.insert(donation.donor_id, ranked.len());
            ranked.push(TopDonor {
                donor_id: donation.donor_id,
                donor_name: name.clone(),
                total_amount: donation.amount,
                donation_count: 1,
            });
        }
    }

    ranked.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    ranked.truncate(limit);
    ranked
}

/// Totals, top donors, and recent donations for the whole pool.
pub async fn donation_stats(db: &DatabaseConnection) -> Result<DonationStats> {
    let total_amount = ledger::sum_donations(db).await?;
    let total_count = Donation::find().count(db).await?;

    let all = Donation::find()
        .order_by_asc(donation::Column::Id)
        .all(db)
        .await?;
    let top_donors = rank_donors(&all, TOP_DONOR_LIMIT);

    let recent_donations = Donation::find()
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .limit(RECENT_DONATION_LIMIT)
        .all(db)
        .await?;

    Ok(DonationStats {
        total_amount,
        total_count,
        top_donors,
        recent_donations,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::require_user;
    use crate::notify;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_record_donation_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();

        let missing = record_donation(
            &db,
            &events,
            NewDonation {
                donor_id: 1,
                amount: None,
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(missing.unwrap_err(), Error::Validation { .. }));

        let negative = record_donation(
            &db,
            &events,
            NewDonation {
                donor_id: 1,
                amount: Some(-5),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(negative.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_donation_moves_money_into_fund() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, mut rx) = notify::channel();
        let donor = create_test_user(&db, "Ivan", 150_000).await?;

        let receipt = record_donation(
            &db,
            &events,
            NewDonation {
                donor_id: donor.id,
                amount: Some(50_000),
                message: Some("Happy to help".to_string()),
                is_anonymous: false,
            },
        )
        .await?;

        assert_eq!(receipt.remaining_balance, 100_000);
        assert_eq!(receipt.total_donated, 50_000);
        assert_eq!(receipt.donation.donor_name.as_deref(), Some("Ivan"));

        let fund = ledger::get_ledger(&db).await?;
        assert_eq!(fund.available, 50_000);
        assert!(ledger::verify_ledger(&db).await?);

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            DomainEvent::DonationRecorded {
                pending_requests: 0,
                fund_available: 50_000,
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_donation_reports_pending_requests() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, mut rx) = notify::channel();
        let donor = create_test_user(&db, "Ivan", 150_000).await?;
        let needy = create_test_user(&db, "Maria", 0).await?;
        submit_test_request(&db, needy.id, 10_000).await?;

        record_donation(
            &db,
            &events,
            NewDonation {
                donor_id: donor.id,
                amount: Some(5_000),
                ..Default::default()
            },
        )
        .await?;

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            DomainEvent::DonationRecorded {
                pending_requests: 1,
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_donation_beyond_balance_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, mut rx) = notify::channel();
        let donor = create_test_user(&db, "Ivan", 1_000).await?;

        let result = record_donation(
            &db,
            &events,
            NewDonation {
                donor_id: donor.id,
                amount: Some(5_000),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds {
                available: 1_000,
                required: 5_000
            }
        ));

        let unchanged = require_user(&db, donor.id).await?;
        assert_eq!(unchanged.balance, 1_000);
        assert_eq!(unchanged.total_donated, 0);
        assert_eq!(ledger::get_ledger(&db).await?.available, 0);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_donor_is_validation_error() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();

        let result = record_donation(
            &db,
            &events,
            NewDonation {
                donor_id: 77,
                amount: Some(100),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_donation_stats_hide_anonymous_donors() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let ivan = create_test_user(&db, "Ivan", 100_000).await?;
        let maria = create_test_user(&db, "Maria", 100_000).await?;

        for (donor_id, amount, is_anonymous) in [
            (ivan.id, 10_000, false),
            (maria.id, 30_000, true),
            (ivan.id, 5_000, false),
            (maria.id, 2_000, false),
        ] {
            record_donation(
                &db,
                &events,
                NewDonation {
                    donor_id,
                    amount: Some(amount),
                    message: None,
                    is_anonymous,
                },
            )
            .await?;
        }

        let stats = donation_stats(&db).await?;
        assert_eq!(stats.total_amount, 47_000);
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.recent_donations.len(), 4);
        assert_eq!(
            stats.top_donors,
            vec![
                TopDonor {
                    donor_id: ivan.id,
                    donor_name: "Ivan".to_string(),
                    total_amount: 15_000,
                    donation_count: 2,
                },
                TopDonor {
                    donor_id: maria.id,
                    donor_name: "Maria".to_string(),
                    total_amount: 2_000,
                    donation_count: 1,
                },
            ]
        );

        let anonymous = stats
            .recent_donations
            .iter()
            .find(|d| d.is_anonymous)
            .unwrap();
        assert!(anonymous.donor_name.is_none());

        assert_eq!(donations_for_user(&db, maria.id).await?.len(), 2);
        Ok(())
    }
}
