//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Linking Discord accounts to charity-hub users
pub mod account;

/// Fund status commands
pub mod fund;

/// General utility commands
pub mod general;

/// Admin commands for reviewing and deciding help requests
pub mod help_request;

// Export commands
pub use account::*;
pub use fund::*;
pub use general::*;
pub use help_request::*;
