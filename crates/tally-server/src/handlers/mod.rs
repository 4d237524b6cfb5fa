//! HTTP request handlers organized by domain

pub mod categories;
pub mod import;
pub mod reports;
pub mod rules;
pub mod transactions;
pub mod units;

// Re-export all handlers for use in the router
pub use categories::*;
pub use import::*;
pub use reports::*;
pub use rules::*;
pub use transactions::*;
pub use units::*;
