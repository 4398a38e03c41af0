//! Transaction domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency::Currency;
use super::user::UserId;

/// Unique identifier for a Transaction, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Wraps a store-assigned id.
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Status of a transaction record.
///
/// `Reversed` is terminal: the negated balance delta has been applied
/// exactly once and no further reversal is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Posted,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Posted => "POSTED",
            TransactionStatus::Reversed => "REVERSED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction filter for windowed transaction queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionDirection {
    /// Positive amounts
    Deposits,
    /// Negative amounts
    Withdrawals,
}

impl TransactionDirection {
    /// Whether a signed amount falls in this direction.
    pub fn matches(&self, amount: Decimal) -> bool {
        match self {
            TransactionDirection::Deposits => amount > Decimal::ZERO,
            TransactionDirection::Withdrawals => amount < Decimal::ZERO,
        }
    }
}

/// A recorded balance movement.
///
/// Positive amount = deposit, negative = withdrawal. The amount and the
/// owning balance are coupled: the sum of non-reversed amounts for a
/// (user, currency) always equals that balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Owning user
    pub user_id: UserId,
    /// Currency of the affected balance
    pub currency: Currency,
    /// Signed amount, exact decimal
    pub amount: Decimal,
    /// Posted or reversed
    pub status: TransactionStatus,
    /// When the transaction was created
    pub created: DateTime<Utc>,
}

impl Transaction {
    /// Reconstructs a transaction from database fields.
    pub fn from_parts(
        id: TransactionId,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        status: TransactionStatus,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            currency,
            amount,
            status,
            created,
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_withdrawal(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn is_reversed(&self) -> bool {
        self.status == TransactionStatus::Reversed
    }

    /// The delta that undoes this transaction's balance effect.
    pub fn reversal_amount(&self) -> Decimal {
        -self.amount
    }
}
