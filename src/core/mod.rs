/// Product catalog, comments, and ratings
pub mod catalog;

/// Donations into the charitable fund and donation statistics
pub mod donation;

/// Help request submission and the approve/reject workflow
pub mod help_request;

/// Running fund ledger and its history-derived audit
pub mod ledger;

/// Buying products with a user's balance
pub mod purchase;

/// User accounts, balances, and purchase history
pub mod user;
