//! Upstream data sources.

mod common;
pub mod stripe;

pub use stripe::{resolve_api_key, StripeClient};
