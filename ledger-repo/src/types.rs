//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use ledger_types::{
    Balance, Currency, RepoError, Transaction, TransactionId, TransactionStatus, User, UserId,
    UserStatus,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use rust_decimal::Decimal;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// User row from database.
#[derive(FromRow)]
pub struct DbUser {
    pub id: i64,
    pub email: String,
    pub status: String,

    #[cfg(not(feature = "sqlite"))]
    pub created: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created: String,
}

/// Balance row from database.
#[derive(FromRow)]
pub struct DbBalance {
    pub user_id: i64,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub amount: Decimal,
    #[cfg(feature = "sqlite")]
    pub amount: String,
}

/// Transaction row from database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: i64,
    pub user_id: i64,
    pub currency: String,
    pub status: String,

    #[cfg(not(feature = "sqlite"))]
    pub amount: Decimal,
    #[cfg(feature = "sqlite")]
    pub amount: String,

    #[cfg(not(feature = "sqlite"))]
    pub created: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    s.parse().map_err(RepoError::Database)
}

pub fn parse_user_status(s: &str) -> Result<UserStatus, RepoError> {
    match s {
        "ACTIVE" => Ok(UserStatus::Active),
        "BLOCKED" => Ok(UserStatus::Blocked),
        _ => Err(RepoError::Database(format!("Unknown user status: {}", s))),
    }
}

pub fn parse_transaction_status(s: &str) -> Result<TransactionStatus, RepoError> {
    match s {
        "POSTED" => Ok(TransactionStatus::Posted),
        "REVERSED" => Ok(TransactionStatus::Reversed),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction status: {}",
            s
        ))),
    }
}

#[cfg(feature = "sqlite")]
pub fn parse_amount(s: &str) -> Result<rust_decimal::Decimal, RepoError> {
    s.parse()
        .map_err(|e: rust_decimal::Error| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepoError::Database(e.to_string()))
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbUser {
    /// Convert database row to domain User.
    pub fn into_domain(self) -> Result<User, RepoError> {
        let status = parse_user_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let created = self.created;

        #[cfg(feature = "sqlite")]
        let created = parse_timestamp(&self.created)?;

        Ok(User::from_parts(
            UserId::from_i64(self.id),
            self.email,
            status,
            created,
        ))
    }
}

impl DbBalance {
    /// Convert database row to domain Balance.
    pub fn into_domain(self) -> Result<Balance, RepoError> {
        let currency = parse_currency(&self.currency)?;

        #[cfg(not(feature = "sqlite"))]
        let amount = self.amount;

        #[cfg(feature = "sqlite")]
        let amount = parse_amount(&self.amount)?;

        Ok(Balance::from_parts(
            UserId::from_i64(self.user_id),
            currency,
            amount,
        ))
    }
}

impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let status = parse_transaction_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let (amount, created) = (self.amount, self.created);

        #[cfg(feature = "sqlite")]
        let (amount, created) = (parse_amount(&self.amount)?, parse_timestamp(&self.created)?);

        Ok(Transaction::from_parts(
            TransactionId::from_i64(self.id),
            UserId::from_i64(self.user_id),
            currency,
            amount,
            status,
            created,
        ))
    }
}
