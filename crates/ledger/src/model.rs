use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::amount::Amount;

// ---------------------------------------------------------------------------
// Stripe records
// ---------------------------------------------------------------------------

/// Balance transaction type that never produces ledger rows.
pub const PAYOUT_FAILURE: &str = "payout_failure";

/// A `/v1/balance_transactions` list item. Unused fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Charge, refund or payout this movement belongs to.
    #[serde(default)]
    pub source: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub created: i64,
    #[serde(default)]
    pub fee_details: Vec<FeeDetail>,
}

impl BalanceTransaction {
    /// Ledger key: the non-empty `source`, else the transaction's own id.
    pub fn reference(&self) -> &str {
        match self.source.as_deref() {
            Some(source) if !source.is_empty() => source,
            _ => &self.id,
        }
    }

    pub fn is_payout_failure(&self) -> bool {
        self.kind == PAYOUT_FAILURE
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeeDetail {
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// A `/v1/charges` list item.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
    /// Legacy payment source (card). Absent on PaymentMethod-based charges.
    #[serde(default)]
    pub source: Option<PaymentSource>,
}

impl Charge {
    pub fn payee_name(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentSource {
    #[serde(default)]
    pub name: Option<String>,
}

/// A `charge.refunded` event from `/v1/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundEvent {
    pub id: String,
    pub data: RefundEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundEventData {
    pub object: RefundedCharge,
}

/// The charge snapshot carried by a `charge.refunded` event.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundedCharge {
    #[serde(default)]
    pub refunds: Option<RefundList>,
    #[serde(default)]
    pub source: Option<PaymentSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundList {
    #[serde(default)]
    pub data: Vec<Refund>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
}

impl RefundEvent {
    /// Id of the first refund on the charge, which keys the refund's
    /// balance-transaction row. `None` when the list is missing or empty.
    pub fn refund_reference(&self) -> Option<&str> {
        self.data
            .object
            .refunds
            .as_ref()
            .and_then(|list| list.data.first())
            .map(|refund| refund.id.as_str())
    }

    pub fn payee_name(&self) -> Option<&str> {
        self.data.object.source.as_ref().and_then(|s| s.name.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One line of the accounting-import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub amount: Amount,
    pub payee: String,
    pub description: String,
    /// Value of the Reference column. Fee rows carry their parent
    /// transaction id here, not their own ledger key.
    pub reference: String,
    pub timestamp: NaiveDateTime,
}
