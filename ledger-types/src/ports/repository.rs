//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory test doubles) implement this trait.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Balance, Currency, Transaction, TransactionDirection, TransactionId, TransactionStatus, User,
    UserId, UserStatus,
};
use crate::dto::UserFilter;
use crate::error::RepoError;

/// The main repository port for ledger operations.
///
/// `post_transaction` and `reverse_transaction` couple a balance delta to a
/// transaction-record write and MUST be atomic: implementations run both
/// writes in one store transaction, re-validate the non-negative balance
/// invariant inside it, and serialize concurrent delta applications on the
/// same (user, currency) pair.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // User Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a user together with a zero balance for every supported
    /// currency, atomically.
    async fn create_user(&self, email: &str) -> Result<(User, Vec<Balance>), RepoError>;

    /// Gets a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    /// Lists users matching the filter, newest first.
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, RepoError>;

    /// Checks whether a user with the given email exists.
    async fn email_exists(&self, email: &str) -> Result<bool, RepoError>;

    /// Sets a user's status and returns the updated row.
    async fn update_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<User, RepoError>;

    /// Lists users registered inside a time window (reporting surface).
    async fn list_users_registered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<User>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Balance Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Point lookup of one currency balance.
    async fn get_balance(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<Option<Balance>, RepoError>;

    /// All balances of a user, in supported-currency order.
    async fn list_balances(&self, user_id: UserId) -> Result<Vec<Balance>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies the signed amount to the (user, currency) balance and inserts
    /// a POSTED transaction record, in one store transaction.
    ///
    /// Fails with `DomainError::BalanceNotFound` if the balance row is
    /// missing and `DomainError::InsufficientBalance` if the delta would
    /// drive the balance negative; either failure rolls back both writes.
    async fn post_transaction(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Transaction, RepoError>;

    /// Applies the negated amount of the given transaction to its balance
    /// and flips the record to REVERSED, in one store transaction.
    ///
    /// Re-validates inside the transaction that the record is still POSTED
    /// (`DomainError::TransactionAlreadyReversed`) and that the balance
    /// stays non-negative (`DomainError::InsufficientBalance`).
    async fn reverse_transaction(&self, id: TransactionId) -> Result<Transaction, RepoError>;

    /// Gets a transaction by id.
    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, RepoError>;

    /// Lists one user's transactions, newest first, paginated.
    async fn list_transactions_for_user(
        &self,
        user_id: UserId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepoError>;

    /// Lists all transactions, newest first, paginated.
    async fn list_transactions(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Windowed queries (reporting surface)
    // ─────────────────────────────────────────────────────────────────────────

    /// Counts transactions created inside a time window.
    async fn count_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<TransactionStatus>,
    ) -> Result<i64, RepoError>;

    /// Lists transactions created inside a time window, optionally filtered
    /// by status and amount direction.
    async fn list_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<TransactionStatus>,
        direction: Option<TransactionDirection>,
    ) -> Result<Vec<Transaction>, RepoError>;

    /// Sums transaction amounts inside a time window with the same filters,
    /// plus an optional currency filter. Returns zero for an empty window.
    async fn sum_amounts_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        currency: Option<Currency>,
        status: Option<TransactionStatus>,
        direction: Option<TransactionDirection>,
    ) -> Result<Decimal, RepoError>;
}
