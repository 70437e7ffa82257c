//! Fund ledger business logic - Tracks how much of the charitable fund can still be disbursed.
//!
//! The authoritative balance lives in the single `fund_ledger` row. Donations
//! credit it and approvals debit it inside their own database transactions, and
//! the debit is a conditional update (`available >= amount`), so two concurrent
//! approvals can never both spend the same money. The derived formula
//! `sum(donations) - sum(completed requests)` is kept as a pure function and as
//! SQL aggregates; it is used to rebuild the row at startup and to audit it.

use crate::{
    entities::{
        Donation, FundLedger, HelpRequest, HelpStatus, donation, fund_ledger,
        fund_ledger::LEDGER_ID, help_request,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Snapshot of the fund for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundSummary {
    /// Sum of all donations ever made
    pub total_donated: i64,
    /// Sum of all completed help requests
    pub total_disbursed: i64,
    /// Money that can still be disbursed
    pub available: i64,
    /// Number of help requests waiting for a decision
    pub pending_requests: u64,
    /// Sum of the amounts of pending help requests
    pub pending_amount: i64,
}

/// Computes the available fund balance from raw history.
///
/// Only requests in `completed` status count as disbursed; everything else in
/// `requests` is ignored.
pub fn compute_available<'a>(
    donations: impl IntoIterator<Item = &'a donation::Model>,
    requests: impl IntoIterator<Item = &'a help_request::Model>,
) -> i64 {
    let donated: i64 = donations.into_iter().map(|d| d.amount).sum();
    let disbursed: i64 = requests
        .into_iter()
        .filter(|r| r.status == HelpStatus::Completed)
        .map(|r| r.amount)
        .sum();
    donated - disbursed
}

/// Sums every donation amount with a SQL aggregate.
pub async fn sum_donations<C>(db: &C) -> Result<i64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<i64>> = Donation::find()
        .select_only()
        .column_as(Expr::col(donation::Column::Amount).sum(), "total")
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// Sums the amounts of help requests in the given status with a SQL aggregate.
pub async fn sum_requests_with_status<C>(db: &C, status: HelpStatus) -> Result<i64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<i64>> = HelpRequest::find()
        .select_only()
        .column_as(Expr::col(help_request::Column::Amount).sum(), "total")
        .filter(help_request::Column::Status.eq(status))
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// Available balance derived from the full history, ignoring the ledger row.
pub async fn available_from_history<C>(db: &C) -> Result<i64>
where
    C: ConnectionTrait,
{
    let donated = sum_donations(db).await?;
    let disbursed = sum_requests_with_status(db, HelpStatus::Completed).await?;
    Ok(donated - disbursed)
}

/// Reads the ledger row.
pub async fn get_ledger<C>(db: &C) -> Result<fund_ledger::Model>
where
    C: ConnectionTrait,
{
    FundLedger::find_by_id(LEDGER_ID)
        .one(db)
        .await?
        .ok_or(Error::LedgerMissing)
}

/// Rewrites the ledger row from history, creating it if needed.
///
/// Logs a warning when an existing row disagreed with the history.
#[instrument(skip(db))]
pub async fn rebuild_ledger<C>(db: &C) -> Result<fund_ledger::Model>
where
    C: ConnectionTrait,
{
    let total_donated = sum_donations(db).await?;
    let total_disbursed = sum_requests_with_status(db, HelpStatus::Completed).await?;
    let available = total_donated - total_disbursed;
    let now = Utc::now();

    let rebuilt = match FundLedger::find_by_id(LEDGER_ID).one(db).await? {
        Some(existing) => {
            if existing.available != available
                || existing.total_donated != total_donated
                || existing.total_disbursed != total_disbursed
            {
                warn!(
                    "Fund ledger drifted from history (stored available {}, derived {}); rebuilding",
                    existing.available, available
                );
            }
            let mut row: fund_ledger::ActiveModel = existing.into();
            row.total_donated = Set(total_donated);
            row.total_disbursed = Set(total_disbursed);
            row.available = Set(available);
            row.updated_at = Set(now);
            row.update(db).await?
        }
        None => {
            fund_ledger::ActiveModel {
                id: Set(LEDGER_ID),
                total_donated: Set(total_donated),
                total_disbursed: Set(total_disbursed),
                available: Set(available),
                updated_at: Set(now),
            }
            .insert(db)
            .await?
        }
    };

    info!("Fund ledger ready: {} available", rebuilt.available);
    Ok(rebuilt)
}

/// Whether the ledger row matches the history-derived balance.
pub async fn verify_ledger<C>(db: &C) -> Result<bool>
where
    C: ConnectionTrait,
{
    let ledger = get_ledger(db).await?;
    Ok(ledger.available == available_from_history(db).await?)
}

/// Credits a donation to the fund. Must run in the donation's transaction.
pub async fn record_inflow<C>(db: &C, amount: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = FundLedger::update_many()
        .col_expr(
            fund_ledger::Column::TotalDonated,
            Expr::col(fund_ledger::Column::TotalDonated).add(amount),
        )
        .col_expr(
            fund_ledger::Column::Available,
            Expr::col(fund_ledger::Column::Available).add(amount),
        )
        .col_expr(fund_ledger::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(fund_ledger::Column::Id.eq(LEDGER_ID))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::LedgerMissing);
    }
    Ok(())
}

/// Debits a disbursement from the fund if, and only if, enough is available.
///
/// The check and the decrement are one conditional UPDATE, so the balance can
/// never go negative no matter how approvals interleave. Must run in the
/// approval's transaction.
pub async fn disburse<C>(db: &C, amount: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = FundLedger::update_many()
        .col_expr(
            fund_ledger::Column::TotalDisbursed,
            Expr::col(fund_ledger::Column::TotalDisbursed).add(amount),
        )
        .col_expr(
            fund_ledger::Column::Available,
            Expr::col(fund_ledger::Column::Available).sub(amount),
        )
        .col_expr(fund_ledger::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(fund_ledger::Column::Id.eq(LEDGER_ID))
        .filter(fund_ledger::Column::Available.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let ledger = get_ledger(db).await?;
        return Err(Error::InsufficientFunds {
            available: ledger.available,
            required: amount,
        });
    }
    Ok(())
}

/// Current fund totals plus the pending-request backlog.
pub async fn fund_summary<C>(db: &C) -> Result<FundSummary>
where
    C: ConnectionTrait,
{
    let ledger = get_ledger(db).await?;
    let pending_requests = HelpRequest::find()
        .filter(help_request::Column::Status.eq(HelpStatus::Pending))
        .count(db)
        .await?;
    let pending_amount = sum_requests_with_status(db, HelpStatus::Pending).await?;

    Ok(FundSummary {
        total_donated: ledger.total_donated,
        total_disbursed: ledger.total_disbursed,
        available: ledger.available,
        pending_requests,
        pending_amount,
    })
}
