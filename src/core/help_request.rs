//! Help request business logic - Submitting requests and the admin decision workflow.
//!
//! A request is filed as `pending` and decided exactly once. Rejection only
//! touches the request row. Approval is a single transaction that debits the
//! fund ledger (conditionally, so it cannot overdraw), credits the requester,
//! and flips the request to `completed`. If any step fails nothing is written
//! and the request stays `pending`, ready to be approved once more money
//! arrives.

use crate::{
    core::{ledger, user as users},
    entities::{HelpRequest, HelpStatus, MAX_HELP_REQUEST_AMOUNT, help_request},
    errors::{Error, Result, is_unique_violation},
    notify::{DomainEvent, EventSender},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::str::FromStr;
use tracing::{info, instrument, warn};

/// Reason stored when an admin rejects without giving one.
pub const DEFAULT_REJECTION_REASON: &str = "Reason not specified";

/// Input for a new help request.
#[derive(Debug, Clone, Default)]
pub struct NewHelpRequest {
    /// Requester's user id
    pub user_id: i64,
    /// Optional phone number
    pub phone: Option<String>,
    /// Optional chat handle
    pub contact_handle: Option<String>,
    /// Why the money is needed
    pub reason: Option<String>,
    /// How much is needed
    pub amount: Option<i64>,
}

/// What an admin decided about a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Pay the request out of the fund
    Approve,
    /// Decline the request
    Reject,
}

impl FromStr for Decision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Ok(Self::Approve),
            "rejected" => Ok(Self::Reject),
            other => Err(Error::validation(format!(
                "Decision must be 'approved' or 'rejected', got '{other}'"
            ))),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Files a new help request for a user.
#[instrument(skip(db, events, input), fields(user_id = input.user_id))]
pub async fn submit_help_request(
    db: &DatabaseConnection,
    events: &EventSender,
    input: NewHelpRequest,
) -> Result<help_request::Model> {
    let reason = non_blank(input.reason).ok_or_else(|| Error::validation("Reason is required"))?;
    let amount = input
        .amount
        .ok_or_else(|| Error::validation("Amount is required"))?;
    if amount <= 0 {
        return Err(Error::validation("Amount must be greater than zero"));
    }
    if amount > MAX_HELP_REQUEST_AMOUNT {
        return Err(Error::validation(format!(
            "Amount cannot exceed {MAX_HELP_REQUEST_AMOUNT}"
        )));
    }

    let txn = db.begin().await?;

    let requester = users::require_user(&txn, input.user_id).await?;

    let active = HelpRequest::find()
        .filter(help_request::Column::UserId.eq(requester.id))
        .filter(help_request::Column::Status.is_in(HelpStatus::ACTIVE))
        .one(&txn)
        .await?;
    if let Some(existing) = active {
        return Err(Error::conflict(format!(
            "User {} already has an active help request (#{}, {})",
            requester.id, existing.id, existing.status
        )));
    }

    let request = help_request::ActiveModel {
        user_id: Set(requester.id),
        user_name: Set(requester.name.clone()),
        user_email: Set(requester.email.clone()),
        phone: Set(non_blank(input.phone)),
        contact_handle: Set(non_blank(input.contact_handle)),
        reason: Set(reason),
        amount: Set(amount),
        status: Set(HelpStatus::Pending),
        approved_by: Set(None),
        approved_at: Set(None),
        completed_at: Set(None),
        rejection_reason: Set(None),
        active_slot: Set(Some(requester.id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict(format!(
                "User {} already has an active help request",
                requester.id
            ))
        } else {
            e.into()
        }
    })?;

    txn.commit().await?;

    info!(
        "Help request #{} for {} filed by user {}",
        request.id, request.amount, request.user_id
    );
    events.emit(DomainEvent::HelpRequestSubmitted {
        request: request.clone(),
    });

    Ok(request)
}

/// Finds a help request by id.
pub async fn get_help_request<C>(db: &C, request_id: i64) -> Result<help_request::Model>
where
    C: ConnectionTrait,
{
    HelpRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(Error::HelpRequestNotFound { id: request_id })
}

/// Lists help requests, newest first, optionally narrowed to one status.
pub async fn list_help_requests(
    db: &DatabaseConnection,
    status: Option<HelpStatus>,
) -> Result<Vec<help_request::Model>> {
    let mut query = HelpRequest::find();
    if let Some(status) = status {
        query = query.filter(help_request::Column::Status.eq(status));
    }
    query
        .order_by_desc(help_request::Column::CreatedAt)
        .order_by_desc(help_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A user's own help requests, newest first.
pub async fn help_requests_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<help_request::Model>> {
    users::require_user(db, user_id).await?;
    HelpRequest::find()
        .filter(help_request::Column::UserId.eq(user_id))
        .order_by_desc(help_request::Column::CreatedAt)
        .order_by_desc(help_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn already_decided(request: &help_request::Model) -> Error {
    Error::conflict(format!(
        "Help request #{} has already been {}",
        request.id, request.status
    ))
}

/// Applies an admin decision to a pending help request.
///
/// Returns the request as stored after the decision. An approval the fund
/// cannot cover fails with [`Error::InsufficientFunds`] and leaves the request
/// pending.
#[instrument(skip(db, events))]
pub async fn decide_help_request(
    db: &DatabaseConnection,
    events: &EventSender,
    request_id: i64,
    decision: Decision,
    approved_by: Option<String>,
    rejection_reason: Option<String>,
) -> Result<help_request::Model> {
    let approved_by = non_blank(approved_by);
    match decision {
        Decision::Reject => {
            let reason = non_blank(rejection_reason)
                .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
            reject(db, events, request_id, approved_by, reason).await
        }
        Decision::Approve => approve(db, events, request_id, approved_by).await,
    }
}

/// Runs `update` against a pending request and releases the requester's active slot.
///
/// Conditional on the row still being pending; zero affected rows means some
/// other decision won.
async fn close_pending<C>(
    db: &C,
    request: &help_request::Model,
    update: sea_orm::UpdateMany<HelpRequest>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = update
        .col_expr(
            help_request::Column::ActiveSlot,
            Expr::value(Option::<i64>::None),
        )
        .filter(help_request::Column::Id.eq(request.id))
        .filter(help_request::Column::Status.eq(HelpStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(already_decided(request));
    }
    Ok(())
}

async fn reject(
    db: &DatabaseConnection,
    events: &EventSender,
    request_id: i64,
    approved_by: Option<String>,
    reason: String,
) -> Result<help_request::Model> {
    let txn = db.begin().await?;

    let request = get_help_request(&txn, request_id).await?;
    if request.status != HelpStatus::Pending {
        return Err(already_decided(&request));
    }

    let update = HelpRequest::update_many()
        .col_expr(
            help_request::Column::Status,
            Expr::value(HelpStatus::Rejected),
        )
        .col_expr(
            help_request::Column::RejectionReason,
            Expr::value(Some(reason)),
        )
        .col_expr(
            help_request::Column::ApprovedBy,
            Expr::value(approved_by),
        )
        .col_expr(
            help_request::Column::ApprovedAt,
            Expr::value(Some(Utc::now())),
        );
    close_pending(&txn, &request, update).await?;

    let rejected = get_help_request(&txn, request_id).await?;
    let requester_channel = users::get_user_by_id(&txn, rejected.user_id)
        .await?
        .and_then(|u| u.notification_channel);

    txn.commit().await?;

    info!("Help request #{} rejected", rejected.id);
    events.emit(DomainEvent::HelpRequestRejected {
        request: rejected.clone(),
        requester_channel,
    });

    Ok(rejected)
}

async fn approve(
    db: &DatabaseConnection,
    events: &EventSender,
    request_id: i64,
    approved_by: Option<String>,
) -> Result<help_request::Model> {
    let txn = db.begin().await?;

    let request = get_help_request(&txn, request_id).await?;
    if request.status != HelpStatus::Pending {
        return Err(already_decided(&request));
    }

    if let Err(e) = ledger::disburse(&txn, request.amount).await {
        if let Error::InsufficientFunds {
            available,
            required,
        } = &e
        {
            warn!(
                "Cannot approve help request #{}: fund has {}, needs {}",
                request.id, available, required
            );
        }
        return Err(e);
    }

    let requester = users::credit_balance(&txn, request.user_id, request.amount).await?;

    let now = Utc::now();
    let update = HelpRequest::update_many()
        .col_expr(
            help_request::Column::Status,
            Expr::value(HelpStatus::Completed),
        )
        .col_expr(
            help_request::Column::ApprovedBy,
            Expr::value(approved_by),
        )
        .col_expr(help_request::Column::ApprovedAt, Expr::value(Some(now)))
        .col_expr(help_request::Column::CompletedAt, Expr::value(Some(now)));
    close_pending(&txn, &request, update).await?;

    let completed = get_help_request(&txn, request_id).await?;

    txn.commit().await?;

    info!(
        "Help request #{} approved: {} credited to user {}",
        completed.id, completed.amount, completed.user_id
    );
    events.emit(DomainEvent::HelpRequestApproved {
        request: completed.clone(),
        requester_channel: requester.notification_channel,
        new_balance: requester.balance,
    });

    Ok(completed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::require_user;
    use crate::notify;
    use crate::test_utils::*;

    fn request_for(user_id: i64, amount: i64) -> NewHelpRequest {
        NewHelpRequest {
            user_id,
            phone: Some("+998901234567".to_string()),
            contact_handle: None,
            reason: Some("Medical bills".to_string()),
            amount: Some(amount),
        }
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("approved".parse::<Decision>().unwrap(), Decision::Approve);
        assert_eq!(" Rejected ".parse::<Decision>().unwrap(), Decision::Reject);
        assert!(matches!(
            "completed".parse::<Decision>().unwrap_err(),
            Error::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_submit_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();

        for bad in [
            NewHelpRequest {
                reason: None,
                ..request_for(1, 100)
            },
            NewHelpRequest {
                reason: Some("   ".to_string()),
                ..request_for(1, 100)
            },
            NewHelpRequest {
                amount: None,
                ..request_for(1, 100)
            },
            request_for(1, 0),
            request_for(1, MAX_HELP_REQUEST_AMOUNT + 1),
        ] {
            let result = submit_help_request(&db, &events, bad).await;
            assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_snapshots_requester_and_notifies() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, mut rx) = notify::channel();
        let maria = create_test_user(&db, "Maria", 0).await?;

        let request = submit_help_request(&db, &events, request_for(maria.id, 45_000)).await?;
        assert_eq!(request.status, HelpStatus::Pending);
        assert_eq!(request.user_name, "Maria");
        assert_eq!(request.user_email, maria.email);
        assert_eq!(request.active_slot, Some(maria.id));

        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::HelpRequestSubmitted { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let result = submit_help_request(&db, &events, request_for(404, 100)).await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { id: 404 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_active_request_per_user() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let maria = create_test_user(&db, "Maria", 0).await?;

        let first = submit_help_request(&db, &events, request_for(maria.id, 1_000)).await?;
        let second = submit_help_request(&db, &events, request_for(maria.id, 2_000)).await;
        assert!(matches!(second.unwrap_err(), Error::Conflict { .. }));

        decide_help_request(&db, &events, first.id, Decision::Reject, None, None).await?;

        let third = submit_help_request(&db, &events, request_for(maria.id, 2_000)).await?;
        assert_eq!(third.status, HelpStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_approval_scenario() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, mut rx) = notify::channel();
        let donor = create_test_user(&db, "Ivan", 200_000).await?;
        seed_donation(&db, donor.id, 60_000).await?;
        seed_donation(&db, donor.id, 40_000).await?;

        let maria = create_test_user(&db, "Maria", 1_000).await?;
        let request = submit_test_request(&db, maria.id, 45_000).await?;

        let completed = decide_help_request(
            &db,
            &events,
            request.id,
            Decision::Approve,
            Some("Admin".to_string()),
            None,
        )
        .await?;
        assert_eq!(completed.status, HelpStatus::Completed);
        assert_eq!(completed.approved_by.as_deref(), Some("Admin"));
        assert!(completed.approved_at.is_some());
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.active_slot, None);

        assert_eq!(require_user(&db, maria.id).await?.balance, 46_000);
        assert_eq!(ledger::get_ledger(&db).await?.available, 55_000);
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::HelpRequestApproved {
                new_balance: 46_000,
                ..
            }
        ));

        // Above the cap never reaches the fund check
        let oleg = create_test_user(&db, "Oleg", 0).await?;
        let too_big = submit_help_request(&db, &events, request_for(oleg.id, 60_000)).await;
        assert!(matches!(too_big.unwrap_err(), Error::Validation { .. }));

        let big = submit_test_request(&db, oleg.id, 50_000).await?;
        decide_help_request(&db, &events, big.id, Decision::Approve, None, None).await?;
        assert_eq!(ledger::get_ledger(&db).await?.available, 5_000);

        let anna = create_test_user(&db, "Anna", 0).await?;
        let short = submit_test_request(&db, anna.id, 20_000).await?;
        let result =
            decide_help_request(&db, &events, short.id, Decision::Approve, None, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds {
                available: 5_000,
                required: 20_000
            }
        ));

        let still_pending = get_help_request(&db, short.id).await?;
        assert_eq!(still_pending.status, HelpStatus::Pending);
        assert_eq!(require_user(&db, anna.id).await?.balance, 0);
        assert_eq!(ledger::get_ledger(&db).await?.available, 5_000);
        assert!(ledger::verify_ledger(&db).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_reject_without_reason_uses_placeholder() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, mut rx) = notify::channel();
        let maria = create_test_user(&db, "Maria", 500).await?;
        let request = submit_test_request(&db, maria.id, 10_000).await?;

        let rejected = decide_help_request(
            &db,
            &events,
            request.id,
            Decision::Reject,
            Some("Admin".to_string()),
            Some("  ".to_string()),
        )
        .await?;

        assert_eq!(rejected.status, HelpStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some(DEFAULT_REJECTION_REASON)
        );
        assert!(rejected.approved_at.is_some());
        assert!(rejected.completed_at.is_none());
        assert_eq!(require_user(&db, maria.id).await?.balance, 500);
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::HelpRequestRejected { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_decided_requests_cannot_be_decided_again() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let donor = create_test_user(&db, "Ivan", 100_000).await?;
        seed_donation(&db, donor.id, 50_000).await?;

        let maria = create_test_user(&db, "Maria", 0).await?;
        let approved = submit_test_request(&db, maria.id, 10_000).await?;
        decide_help_request(&db, &events, approved.id, Decision::Approve, None, None).await?;

        for decision in [Decision::Approve, Decision::Reject] {
            let again =
                decide_help_request(&db, &events, approved.id, decision, None, None).await;
            assert!(matches!(again.unwrap_err(), Error::Conflict { .. }));
        }
        assert_eq!(require_user(&db, maria.id).await?.balance, 10_000);

        let oleg = create_test_user(&db, "Oleg", 0).await?;
        let rejected = submit_test_request(&db, oleg.id, 10_000).await?;
        decide_help_request(&db, &events, rejected.id, Decision::Reject, None, None).await?;
        let again =
            decide_help_request(&db, &events, rejected.id, Decision::Approve, None, None).await;
        assert!(matches!(again.unwrap_err(), Error::Conflict { .. }));
        assert_eq!(ledger::get_ledger(&db).await?.available, 40_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_decide_unknown_request() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let result = decide_help_request(&db, &events, 99, Decision::Approve, None, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::HelpRequestNotFound { id: 99 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_approvals_never_overdraw() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let donor = create_test_user(&db, "Ivan", 100_000).await?;
        seed_donation(&db, donor.id, 50_000).await?;

        let maria = create_test_user(&db, "Maria", 0).await?;
        let oleg = create_test_user(&db, "Oleg", 0).await?;
        let first = submit_test_request(&db, maria.id, 30_000).await?;
        let second = submit_test_request(&db, oleg.id, 30_000).await?;

        let (a, b) = tokio::join!(
            decide_help_request(&db, &events, first.id, Decision::Approve, None, None),
            decide_help_request(&db, &events, second.id, Decision::Approve, None, None),
        );

        let outcomes = [a, b];
        let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
        let short = outcomes
            .iter()
            .filter(|r| matches!(r, Err(Error::InsufficientFunds { .. })))
            .count();
        assert_eq!(succeeded, 1);
        assert_eq!(short, 1);

        let fund = ledger::get_ledger(&db).await?;
        assert_eq!(fund.available, 20_000);
        assert_eq!(fund.total_disbursed, 30_000);
        assert!(ledger::verify_ledger(&db).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_by_status_and_user() -> Result<()> {
        let db = setup_test_db().await?;
        let (events, _rx) = notify::channel();
        let maria = create_test_user(&db, "Maria", 0).await?;
        let oleg = create_test_user(&db, "Oleg", 0).await?;

        let rejected = submit_test_request(&db, maria.id, 1_000).await?;
        decide_help_request(&db, &events, rejected.id, Decision::Reject, None, None).await?;
        submit_test_request(&db, maria.id, 2_000).await?;
        submit_test_request(&db, oleg.id, 3_000).await?;

        assert_eq!(list_help_requests(&db, None).await?.len(), 3);
        assert_eq!(
            list_help_requests(&db, Some(HelpStatus::Pending))
                .await?
                .len(),
            2
        );
        assert_eq!(
            list_help_requests(&db, Some(HelpStatus::Rejected))
                .await?
                .len(),
            1
        );

        let marias = help_requests_for_user(&db, maria.id).await?;
        assert_eq!(marias.len(), 2);
        assert_eq!(marias[0].amount, 2_000);

        let missing = help_requests_for_user(&db, 404).await;
        assert!(matches!(missing.unwrap_err(), Error::UserNotFound { id: 404 }));
        Ok(())
    }
}
