//! `stripe-csv-ledger`: reconciliation engine for Stripe exports.
//!
//! Receives already-fetched Stripe records (balance transactions, charges,
//! refund events) and folds them into an ordered, reference-keyed ledger
//! that serializes to an accounting-import CSV. No network or CLI
//! dependencies.

pub mod amount;
pub mod builder;
pub mod error;
pub mod export;
pub mod model;

pub use amount::Amount;
pub use builder::{build_ledger, BuildStats, Ledger, LedgerBuilder};
pub use error::LedgerError;
pub use export::{ensure_output_available, write_csv, write_csv_file};
pub use model::{BalanceTransaction, Charge, FeeDetail, LedgerRow, RefundEvent};
