//! Per-currency balance domain model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency::Currency;
use super::user::UserId;
use crate::error::DomainError;

/// The amount a user holds in one currency.
///
/// Invariant: `amount >= 0` at every transaction-commit boundary. The only
/// writer is the delta-apply inside the transaction core's atomic step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Owning user
    pub user_id: UserId,
    /// Currency of this balance row
    pub currency: Currency,
    /// Current amount, exact decimal
    pub amount: Decimal,
}

impl Balance {
    /// A fresh zero balance, as created alongside the user.
    pub fn zero(user_id: UserId, currency: Currency) -> Self {
        Self {
            user_id,
            currency,
            amount: Decimal::ZERO,
        }
    }

    /// Reconstructs a balance from database fields.
    pub fn from_parts(user_id: UserId, currency: Currency, amount: Decimal) -> Self {
        Self {
            user_id,
            currency,
            amount,
        }
    }

    /// Computes the amount after applying a signed delta.
    ///
    /// Fails with `InsufficientBalance` when the result would be negative.
    /// The repository re-runs this exact check inside the store transaction.
    pub fn project(&self, delta: Decimal) -> Result<Decimal, DomainError> {
        let projected = self.amount + delta;
        if projected < Decimal::ZERO {
            return Err(DomainError::InsufficientBalance {
                currency: self.currency,
                current: self.amount,
                requested: delta,
            });
        }
        Ok(projected)
    }
}
