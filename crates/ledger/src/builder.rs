//! Folds the three Stripe record streams into one ledger.
//!
//! Pass order matters: balance transactions create every row, then charges
//! and refund events only fill in the payee of rows that already exist.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone};

use crate::amount::Amount;
use crate::error::LedgerError;
use crate::model::{BalanceTransaction, Charge, LedgerRow, RefundEvent};

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Insertion-ordered map of ledger key → row.
///
/// Re-inserting an existing key replaces the row in place; the key keeps
/// its original position.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    entries: Vec<(String, LedgerRow)>,
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&LedgerRow> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> impl Iterator<Item = &LedgerRow> {
        self.entries.iter().map(|(_, row)| row)
    }

    fn upsert(&mut self, key: String, row: LedgerRow) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = row,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, row));
            }
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut LedgerRow> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters reported after a build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub transactions: usize,
    pub payout_failures_skipped: usize,
    pub fee_rows: usize,
    pub charges_seen: usize,
    pub payees_from_charges: usize,
    pub refund_events_seen: usize,
    pub payees_from_refunds: usize,
    pub refund_events_without_refunds: usize,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incremental ledger construction.
///
/// `tz` decides the calendar day and wall-clock timestamp derived from each
/// record's unix `created` value.
pub struct LedgerBuilder<Tz: TimeZone> {
    tz: Tz,
    ledger: Ledger,
    stats: BuildStats,
}

impl<Tz: TimeZone> LedgerBuilder<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            ledger: Ledger::new(),
            stats: BuildStats::default(),
        }
    }

    /// Add one balance transaction plus one row per fee line.
    ///
    /// `payout_failure` transactions are skipped.
    pub fn add_balance_transaction(&mut self, txn: &BalanceTransaction) -> Result<(), LedgerError> {
        if txn.is_payout_failure() {
            log::debug!("skipping payout_failure {}", txn.id);
            self.stats.payout_failures_skipped += 1;
            return Ok(());
        }

        let created = self.local_time(&txn.id, txn.created)?;
        let date = created.date_naive();
        let timestamp = created.naive_local();
        let key = txn.reference().to_string();

        self.ledger.upsert(
            key.clone(),
            LedgerRow {
                date,
                amount: Amount::from_minor_units(txn.amount),
                payee: String::new(),
                description: txn.description.clone().unwrap_or_default(),
                reference: key,
                timestamp,
            },
        );
        self.stats.transactions += 1;

        for (i, fee) in txn.fee_details.iter().enumerate() {
            self.ledger.upsert(
                format!("{}-fee-{}", txn.id, i + 1),
                LedgerRow {
                    date,
                    amount: -Amount::from_minor_units(fee.amount),
                    payee: String::new(),
                    description: fee.description.clone().unwrap_or_default(),
                    reference: txn.id.clone(),
                    timestamp,
                },
            );
            self.stats.fee_rows += 1;
        }

        Ok(())
    }

    /// Copy the charge's payer name onto the row keyed by the charge id.
    /// Returns whether a row was updated.
    pub fn apply_charge(&mut self, charge: &Charge) -> bool {
        self.stats.charges_seen += 1;

        let Some(name) = charge.payee_name() else {
            return false;
        };
        match self.ledger.get_mut(&charge.id) {
            Some(row) => {
                row.payee = name.to_string();
                self.stats.payees_from_charges += 1;
                true
            }
            None => false,
        }
    }

    /// Copy the refunded charge's payer name onto the row keyed by its
    /// first refund id. Events with no refunds listed are skipped.
    pub fn apply_refund_event(&mut self, event: &RefundEvent) -> bool {
        self.stats.refund_events_seen += 1;

        let Some(reference) = event.refund_reference() else {
            log::debug!("refund event {} lists no refunds, skipping", event.id);
            self.stats.refund_events_without_refunds += 1;
            return false;
        };
        let Some(name) = event.payee_name() else {
            return false;
        };
        match self.ledger.get_mut(reference) {
            Some(row) => {
                row.payee = name.to_string();
                self.stats.payees_from_refunds += 1;
                true
            }
            None => false,
        }
    }

    pub fn finish(self) -> (Ledger, BuildStats) {
        (self.ledger, self.stats)
    }

    fn local_time(&self, id: &str, created: i64) -> Result<DateTime<Tz>, LedgerError> {
        self.tz
            .timestamp_opt(created, 0)
            .single()
            .ok_or_else(|| LedgerError::Timestamp {
                id: id.to_string(),
                created,
            })
    }
}

/// Drain the three record streams, in order, into a ledger.
///
/// Each stream is consumed exactly once. The first `Err` from any stream
/// aborts the build and is returned as-is.
pub fn build_ledger<Tz, E, T, C, R>(
    tz: Tz,
    transactions: T,
    charges: C,
    refunds: R,
) -> Result<(Ledger, BuildStats), E>
where
    Tz: TimeZone,
    E: From<LedgerError>,
    T: IntoIterator<Item = Result<BalanceTransaction, E>>,
    C: IntoIterator<Item = Result<Charge, E>>,
    R: IntoIterator<Item = Result<RefundEvent, E>>,
{
    let mut builder = LedgerBuilder::new(tz);

    for txn in transactions {
        builder.add_balance_transaction(&txn?)?;
    }
    for charge in charges {
        builder.apply_charge(&charge?);
    }
    for event in refunds {
        builder.apply_refund_event(&event?);
    }

    let (ledger, stats) = builder.finish();
    log::info!(
        "ledger built: {} rows ({} transactions, {} fee rows, {} payout failures skipped)",
        ledger.len(),
        stats.transactions,
        stats.fee_rows,
        stats.payout_failures_skipped,
    );
    log::info!(
        "payees: {} from {} charges, {} from {} refund events ({} without refunds)",
        stats.payees_from_charges,
        stats.charges_seen,
        stats.payees_from_refunds,
        stats.refund_events_seen,
        stats.refund_events_without_refunds,
    );

    Ok((ledger, stats))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
