//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Balance, Currency, User, UserId, UserStatus};

// ─────────────────────────────────────────────────────────────────────────────
// User DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Email address of the new user (must be unique)
    pub email: String,
}

/// Request to change a user's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: UserStatus,
}

/// Optional filters for user listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

/// One currency balance in a user response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub currency: Currency,
    pub amount: Decimal,
}

impl From<Balance> for BalanceEntry {
    fn from(balance: Balance) -> Self {
        Self {
            currency: balance.currency,
            amount: balance.amount,
        }
    }
}

/// User response without balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub status: UserStatus,
    pub created: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            status: user.status,
            created: user.created,
        }
    }
}

/// User response including all currency balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub id: UserId,
    pub email: String,
    pub status: UserStatus,
    pub created: DateTime<Utc>,
    pub balances: Vec<BalanceEntry>,
}

impl UserDetailResponse {
    /// Assembles the detail response from a user and its balance rows.
    pub fn new(user: User, balances: Vec<Balance>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            status: user.status,
            created: user.created,
            balances: balances.into_iter().map(BalanceEntry::from).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a transaction.
///
/// Positive amount = deposit, negative = withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionRequest {
    pub currency: Currency,
    pub amount: Decimal,
}

/// Pagination parameters for transaction listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    100
}

/// Pagination plus optional user filter, for the global transaction listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Report DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregates for one week of ledger activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    pub registered_users_count: u64,
    pub users_with_deposits_count: u64,
    pub users_with_posted_deposits_count: u64,
    pub users_with_posted_withdrawals_count: u64,

    pub total_deposits_usd: Decimal,
    pub total_withdrawals_usd: Decimal,

    pub total_transactions_count: u64,
    pub posted_transactions_count: u64,
}

impl WeeklyReport {
    /// Whether the week is worth including in the report output.
    pub fn has_activity(&self) -> bool {
        self.registered_users_count > 0
            || self.users_with_deposits_count > 0
            || self.total_transactions_count > 0
    }
}
