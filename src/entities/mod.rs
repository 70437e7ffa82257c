//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod donation;
pub mod fund_ledger;
pub mod help_request;
pub mod product;
pub mod product_comment;
pub mod purchase;
pub mod purchase_item;
pub mod user;

// Re-export specific types to avoid conflicts
pub use donation::{Column as DonationColumn, Entity as Donation, Model as DonationModel};
pub use fund_ledger::{Column as FundLedgerColumn, Entity as FundLedger, Model as FundLedgerModel};
pub use help_request::{
    Column as HelpRequestColumn, Entity as HelpRequest, HelpStatus, MAX_HELP_REQUEST_AMOUNT,
    Model as HelpRequestModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use product_comment::{
    Column as ProductCommentColumn, Entity as ProductComment, Model as ProductCommentModel,
};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use purchase_item::{
    Column as PurchaseItemColumn, Entity as PurchaseItem, Model as PurchaseItemModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
