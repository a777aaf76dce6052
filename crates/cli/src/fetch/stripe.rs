//! Stripe REST client: lazy, cursor-paginated list endpoints.
//!
//! Each `list_*` call returns a [`Pages`] iterator. Nothing is requested
//! until the first `next()`; after that a new page is fetched only when the
//! previous one is drained. Errors are yielded once and end the iterator.

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use stripe_csv_ledger::{BalanceTransaction, Charge, RefundEvent};

use crate::exit_codes;
use crate::CliError;

use super::common::{self, FetchClient};

// ── Constants ───────────────────────────────────────────────────────

pub const STRIPE_KEY_ENV: &str = "STRIPE_API_KEY";
const PAGE_LIMIT: u32 = 100;

/// Event type whose payload carries the refunded charge.
pub const REFUND_EVENT_TYPE: &str = "charge.refunded";

// ── Stripe client ───────────────────────────────────────────────────

pub struct StripeClient {
    client: FetchClient,
    api_key: String,
    account: Option<String>,
    base_url: String,
    show_progress: bool,
}

impl StripeClient {
    pub fn with_base_url(
        api_key: String,
        account: Option<String>,
        base_url: String,
    ) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("Stripe", extract_stripe_error)?,
            api_key,
            account,
            base_url: base_url.trim_end_matches('/').to_string(),
            show_progress: false,
        })
    }

    /// Print a line per fetched page on stderr.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Balance transactions with `created` in `[from_epoch, to_epoch)` in
    /// `currency`.
    pub fn list_balance_transactions(
        &self,
        currency: &str,
        from_epoch: i64,
        to_epoch: i64,
    ) -> Pages<'_, BalanceTransaction> {
        let mut params = created_range(from_epoch, to_epoch);
        params.push(("currency".to_string(), currency.to_lowercase()));
        Pages::new(self, "/v1/balance_transactions", "balance transactions", params)
    }

    /// Charges with `created` in `[from_epoch, to_epoch)`, any currency.
    pub fn list_charges(&self, from_epoch: i64, to_epoch: i64) -> Pages<'_, Charge> {
        Pages::new(self, "/v1/charges", "charges", created_range(from_epoch, to_epoch))
    }

    /// `charge.refunded` events with `created` in `[from_epoch, to_epoch)`.
    pub fn list_refund_events(&self, from_epoch: i64, to_epoch: i64) -> Pages<'_, RefundEvent> {
        let mut params = created_range(from_epoch, to_epoch);
        params.push(("type".to_string(), REFUND_EVENT_TYPE.to_string()));
        Pages::new(self, "/v1/events", "refund events", params)
    }

    /// Fetch one page. Returns the raw items and the `has_more` flag.
    fn fetch_page(
        &self,
        path: &str,
        params: &[(String, String)],
        starting_after: Option<&str>,
    ) -> Result<(Vec<serde_json::Value>, bool), CliError> {
        let mut query = params.to_vec();
        query.push(("limit".to_string(), PAGE_LIMIT.to_string()));
        if let Some(after) = starting_after {
            query.push(("starting_after".to_string(), after.to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        let body = self.client.request(|http| {
            let mut req = http
                .get(&url)
                .basic_auth(&self.api_key, Some(""))
                .query(&query);
            if let Some(ref acct) = self.account {
                req = req.header("Stripe-Account", acct);
            }
            req
        })?;

        let has_more = body["has_more"].as_bool().unwrap_or(false);
        let data = match body {
            serde_json::Value::Object(mut map) => match map.remove("data") {
                Some(serde_json::Value::Array(items)) => items,
                _ => return Err(upstream_error(format!("Stripe response from {} missing 'data' array", path))),
            },
            _ => return Err(upstream_error(format!("Stripe response from {} is not an object", path))),
        };

        // Guard: has_more but empty data = malformed response
        if has_more && data.is_empty() {
            return Err(upstream_error(format!(
                "Stripe returned has_more=true with empty data for {} (malformed response)",
                path
            )));
        }

        Ok((data, has_more))
    }
}

fn created_range(from_epoch: i64, to_epoch: i64) -> Vec<(String, String)> {
    vec![
        ("created[gte]".to_string(), from_epoch.to_string()),
        ("created[lt]".to_string(), to_epoch.to_string()),
    ]
}

fn upstream_error(message: String) -> CliError {
    CliError {
        code: exit_codes::EXIT_FETCH_UPSTREAM,
        message,
        hint: None,
    }
}

fn extract_stripe_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

// ── Lazy pagination ─────────────────────────────────────────────────

/// Forward-only sequence over a Stripe list endpoint.
pub struct Pages<'a, T> {
    stripe: &'a StripeClient,
    path: &'static str,
    label: &'static str,
    params: Vec<(String, String)>,
    buffer: VecDeque<T>,
    starting_after: Option<String>,
    page: u32,
    done: bool,
}

impl<'a, T: DeserializeOwned> Pages<'a, T> {
    fn new(
        stripe: &'a StripeClient,
        path: &'static str,
        label: &'static str,
        params: Vec<(String, String)>,
    ) -> Self {
        Self {
            stripe,
            path,
            label,
            params,
            buffer: VecDeque::new(),
            starting_after: None,
            page: 0,
            done: false,
        }
    }

    fn load_next_page(&mut self) -> Result<(), CliError> {
        self.page += 1;
        let (data, has_more) =
            self.stripe
                .fetch_page(self.path, &self.params, self.starting_after.as_deref())?;

        log::debug!("{} page {}: {} items", self.path, self.page, data.len());
        if self.stripe.show_progress {
            eprintln!("  page {}: {} {}", self.page, data.len(), self.label);
        }

        // Pagination: use last item's ID
        let last_id = data
            .last()
            .and_then(|item| item["id"].as_str())
            .map(str::to_string);

        for item in data {
            let record = serde_json::from_value(item).map_err(|e| {
                upstream_error(format!("cannot decode Stripe {} record: {}", self.label, e))
            })?;
            self.buffer.push_back(record);
        }

        if !has_more {
            self.done = true;
            return Ok(());
        }

        let last_id = last_id.ok_or_else(|| {
            upstream_error(format!(
                "Stripe {} record missing 'id' field for pagination",
                self.label
            ))
        })?;

        // Infinite loop protection: detect repeated starting_after
        if self.starting_after.as_deref() == Some(last_id.as_str()) {
            return Err(upstream_error(format!(
                "Stripe pagination stuck: starting_after={} repeated",
                last_id
            )));
        }

        self.starting_after = Some(last_id);
        Ok(())
    }
}

impl<T: DeserializeOwned> Iterator for Pages<'_, T> {
    type Item = Result<T, CliError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.load_next_page() {
                self.done = true;
                self.buffer.clear();
                return Some(Err(e));
            }
        }
    }
}

pub fn resolve_api_key(flag: Option<String>) -> Result<String, CliError> {
    common::resolve_api_key(flag, "Stripe", STRIPE_KEY_ENV)
}

// ── Tests ───────────────────────────────────────────────────────────
