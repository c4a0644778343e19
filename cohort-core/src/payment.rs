use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Free,
}

impl PaymentStatus {
    /// Statuses that make a registration count for the (buyer, bundle) guard.
    /// There is no cancelled status, so every status is active.
    pub const ACTIVE: [PaymentStatus; 3] = [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Free];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Free => "free",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "free" => Ok(PaymentStatus::Free),
            other => Err(PaymentError::UnknownStatus(other.to_string())),
        }
    }
}

/// Payment fields of a bundle registration.
///
/// The amount collected and the payment date only exist in the `Paid` variant,
/// so a pending or free registration can never carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payment_status", rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Free,
    Paid {
        amount_paid: i64,
        payment_date: DateTime<Utc>,
    },
}

impl PaymentState {
    /// State a freshly fulfilled registration starts in.
    pub fn initial(price_nis: i64) -> Self {
        if price_nis == 0 {
            PaymentState::Free
        } else {
            PaymentState::Pending
        }
    }

    pub fn status(&self) -> PaymentStatus {
        match self {
            PaymentState::Pending => PaymentStatus::Pending,
            PaymentState::Free => PaymentStatus::Free,
            PaymentState::Paid { .. } => PaymentStatus::Paid,
        }
    }

    pub fn amount_paid(&self) -> Option<i64> {
        match self {
            PaymentState::Paid { amount_paid, .. } => Some(*amount_paid),
            _ => None,
        }
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        match self {
            PaymentState::Paid { payment_date, .. } => Some(*payment_date),
            _ => None,
        }
    }

    /// Operator-driven transition. Any state may move to any other state;
    /// only the amount is checked.
    pub fn transition(
        new_status: PaymentStatus,
        amount_paid: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        match new_status {
            PaymentStatus::Paid => {
                let amount = amount_paid.ok_or(PaymentError::MissingAmount)?;
                if amount < 0 {
                    return Err(PaymentError::NegativeAmount(amount));
                }
                Ok(PaymentState::Paid {
                    amount_paid: amount,
                    payment_date: now,
                })
            }
            PaymentStatus::Pending => Ok(PaymentState::Pending),
            PaymentStatus::Free => Ok(PaymentState::Free),
        }
    }

    /// Rebuild from flat storage columns, rejecting rows that break the
    /// "amount and date iff paid" rule.
    pub fn from_columns(
        status: &str,
        amount_paid: Option<i64>,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<Self, PaymentError> {
        match (status.parse::<PaymentStatus>()?, amount_paid, payment_date) {
            (PaymentStatus::Paid, Some(amount_paid), Some(payment_date)) => Ok(PaymentState::Paid {
                amount_paid,
                payment_date,
            }),
            (PaymentStatus::Pending, None, None) => Ok(PaymentState::Pending),
            (PaymentStatus::Free, None, None) => Ok(PaymentState::Free),
            (status, _, _) => Err(PaymentError::InconsistentRecord(status.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Amount paid is required when marking a registration as paid")]
    MissingAmount,

    #[error("Amount paid must not be negative: {0}")]
    NegativeAmount(i64),

    #[error("Unknown payment status: {0}")]
    UnknownStatus(String),

    #[error("Stored payment fields do not match status {0}")]
    InconsistentRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_follows_price() {
        assert_eq!(PaymentState::initial(0), PaymentState::Free);
        assert_eq!(PaymentState::initial(100), PaymentState::Pending);
    }

    #[test]
    fn paid_requires_non_negative_amount() {
        let now = Utc::now();
        assert_eq!(
            PaymentState::transition(PaymentStatus::Paid, None, now),
            Err(PaymentError::MissingAmount)
        );
        assert_eq!(
            PaymentState::transition(PaymentStatus::Paid, Some(-1), now),
            Err(PaymentError::NegativeAmount(-1))
        );

        let paid = PaymentState::transition(PaymentStatus::Paid, Some(0), now).unwrap();
        assert_eq!(paid.amount_paid(), Some(0));
        assert_eq!(paid.payment_date(), Some(now));
    }

    #[test]
    fn leaving_paid_clears_amount_and_date() {
        let now = Utc::now();
        let pending = PaymentState::transition(PaymentStatus::Pending, Some(250), now).unwrap();
        assert_eq!(pending.amount_paid(), None);
        assert_eq!(pending.payment_date(), None);

        let free = PaymentState::transition(PaymentStatus::Free, None, now).unwrap();
        assert_eq!(free.status(), PaymentStatus::Free);
        assert_eq!(free.payment_date(), None);
    }

    #[test]
    fn serializes_flat_with_status_tag() {
        let now = Utc::now();
        let paid = PaymentState::Paid { amount_paid: 100, payment_date: now };
        let json = serde_json::to_value(&paid).unwrap();
        assert_eq!(json["payment_status"], "paid");
        assert_eq!(json["amount_paid"], 100);

        let pending = serde_json::to_value(PaymentState::Pending).unwrap();
        assert_eq!(pending, serde_json::json!({ "payment_status": "pending" }));
    }

    #[test]
    fn storage_columns_must_agree_with_status() {
        let now = Utc::now();
        assert!(PaymentState::from_columns("paid", Some(10), Some(now)).is_ok());
        assert!(PaymentState::from_columns("paid", None, None).is_err());
        assert!(PaymentState::from_columns("pending", Some(10), None).is_err());
        assert!(PaymentState::from_columns("refunded", None, None).is_err());
    }
}
