//! SQLite repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use ledger_types::{
    Balance, Currency, DomainError, LedgerRepository, RepoError, Transaction,
    TransactionDirection, TransactionId, TransactionStatus, User, UserFilter, UserId, UserStatus,
};

use crate::types::{DbBalance, DbTransaction, DbUser};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// The pool is capped at one connection: SQLite allows a single writer, and
/// one pooled connection serializes every balance read-modify-write, which is
/// what gives this adapter its per-(user, currency) serialization guarantee.
/// It also keeps all callers on the same database when using `:memory:`.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        // Run migration from migration file
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;
        tracing::debug!("SQLite migrations applied");

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

fn tx_err(e: sqlx::Error) -> RepoError {
    RepoError::Transaction(e.to_string())
}

fn insert_user_err(e: sqlx::Error, email: &str) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(format!("email '{}' is already registered", email))
        }
        _ => db_err(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteRepo {
    async fn create_user(&self, email: &str) -> Result<(User, Vec<Balance>), RepoError> {
        let now = Utc::now();
        let created_str = now.to_rfc3339();

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        let result =
            sqlx::query(r#"INSERT INTO users (email, status, created) VALUES (?, 'ACTIVE', ?)"#)
                .bind(email)
                .bind(&created_str)
                .execute(&mut *db_tx)
                .await
                .map_err(|e| insert_user_err(e, email))?;

        let user_id = UserId::from_i64(result.last_insert_rowid());

        let mut balances = Vec::with_capacity(Currency::ALL.len());
        for currency in Currency::ALL {
            sqlx::query(r#"INSERT INTO balances (user_id, currency, amount) VALUES (?, ?, '0')"#)
                .bind(user_id.get())
                .bind(currency.code())
                .execute(&mut *db_tx)
                .await
                .map_err(db_err)?;
            balances.push(Balance::zero(user_id, currency));
        }

        db_tx.commit().await.map_err(tx_err)?;

        Ok((
            User::from_parts(user_id, email.to_string(), UserStatus::Active, now),
            balances,
        ))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(r#"SELECT id, email, status, created FROM users WHERE id = ?"#)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, RepoError> {
        let user_id = filter.user_id.map(|id| id.get());
        let email = filter.email.as_deref();
        let status = filter.status.map(|s| s.as_str());

        let rows: Vec<DbUser> = sqlx::query_as(
            r#"SELECT id, email, status, created FROM users
               WHERE (? IS NULL OR id = ?)
                 AND (? IS NULL OR email = ?)
                 AND (? IS NULL OR status = ?)
               ORDER BY created DESC, id DESC"#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(email)
        .bind(email)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbUser::into_domain).collect()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE email = ?"#)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(count > 0)
    }

    async fn update_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<User, RepoError> {
        let result = sqlx::query(r#"UPDATE users SET status = ? WHERE id = ?"#)
            .bind(status.as_str())
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.get_user(id).await?.ok_or(RepoError::NotFound)
    }

    async fn list_users_registered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<User>, RepoError> {
        let rows: Vec<DbUser> = sqlx::query_as(
            r#"SELECT id, email, status, created FROM users
               WHERE created >= ? AND created <= ?"#,
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbUser::into_domain).collect()
    }

    async fn get_balance(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<Option<Balance>, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(
            r#"SELECT user_id, currency, amount FROM balances
               WHERE user_id = ? AND currency = ?"#,
        )
        .bind(user_id.get())
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbBalance::into_domain).transpose()
    }

    async fn list_balances(&self, user_id: UserId) -> Result<Vec<Balance>, RepoError> {
        // Rows were inserted in supported-currency order at user creation;
        // id order preserves it.
        let rows: Vec<DbBalance> = sqlx::query_as(
            r#"SELECT user_id, currency, amount FROM balances
               WHERE user_id = ? ORDER BY id"#,
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbBalance::into_domain).collect()
    }

    async fn post_transaction(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<Transaction, RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        let row: Option<DbBalance> = sqlx::query_as(
            r#"SELECT user_id, currency, amount FROM balances
               WHERE user_id = ? AND currency = ?"#,
        )
        .bind(user_id.get())
        .bind(currency.code())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let balance = row
            .ok_or(RepoError::Domain(DomainError::BalanceNotFound {
                user_id,
                currency,
            }))?
            .into_domain()?;

        // Re-validated here, inside the store transaction, even though the
        // service pre-checked: the pre-check read was unlocked.
        let new_amount = balance.project(amount).map_err(RepoError::Domain)?;

        sqlx::query(r#"UPDATE balances SET amount = ? WHERE user_id = ? AND currency = ?"#)
            .bind(new_amount.to_string())
            .bind(user_id.get())
            .bind(currency.code())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"INSERT INTO transactions (user_id, currency, amount, status, created)
               VALUES (?, ?, ?, 'POSTED', ?)"#,
        )
        .bind(user_id.get())
        .bind(currency.code())
        .bind(amount.to_string())
        .bind(now.to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let id = TransactionId::from_i64(result.last_insert_rowid());

        db_tx.commit().await.map_err(tx_err)?;

        Ok(Transaction::from_parts(
            id,
            user_id,
            currency,
            amount,
            TransactionStatus::Posted,
            now,
        ))
    }

    async fn reverse_transaction(&self, id: TransactionId) -> Result<Transaction, RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions WHERE id = ?"#,
        )
        .bind(id.get())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let transaction = row
            .ok_or(RepoError::Domain(DomainError::TransactionNotFound(id)))?
            .into_domain()?;

        if transaction.is_reversed() {
            return Err(RepoError::Domain(DomainError::TransactionAlreadyReversed(
                id,
            )));
        }

        let row: Option<DbBalance> = sqlx::query_as(
            r#"SELECT user_id, currency, amount FROM balances
               WHERE user_id = ? AND currency = ?"#,
        )
        .bind(transaction.user_id.get())
        .bind(transaction.currency.code())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let balance = row
            .ok_or(RepoError::Domain(DomainError::BalanceNotFound {
                user_id: transaction.user_id,
                currency: transaction.currency,
            }))?
            .into_domain()?;

        let new_amount = balance
            .project(transaction.reversal_amount())
            .map_err(RepoError::Domain)?;

        sqlx::query(r#"UPDATE balances SET amount = ? WHERE user_id = ? AND currency = ?"#)
            .bind(new_amount.to_string())
            .bind(transaction.user_id.get())
            .bind(transaction.currency.code())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        sqlx::query(r#"UPDATE transactions SET status = 'REVERSED' WHERE id = ?"#)
            .bind(id.get())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        db_tx.commit().await.map_err(tx_err)?;

        Ok(Transaction {
            status: TransactionStatus::Reversed,
            ..transaction
        })
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions WHERE id = ?"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn list_transactions_for_user(
        &self,
        user_id: UserId,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions WHERE user_id = ?
               ORDER BY created DESC, id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(user_id.get())
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn list_transactions(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions
               ORDER BY created DESC, id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn count_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<TransactionStatus>,
    ) -> Result<i64, RepoError> {
        let status = status.map(|s| s.as_str());

        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM transactions
               WHERE created >= ? AND created <= ?
                 AND (? IS NULL OR status = ?)"#,
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(count)
    }

    async fn list_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<TransactionStatus>,
        direction: Option<TransactionDirection>,
    ) -> Result<Vec<Transaction>, RepoError> {
        let status = status.map(|s| s.as_str());

        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions
               WHERE created >= ? AND created <= ?
                 AND (? IS NULL OR status = ?)
               ORDER BY created DESC, id DESC"#,
        )
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut transactions: Vec<Transaction> = rows
            .into_iter()
            .map(DbTransaction::into_domain)
            .collect::<Result<_, _>>()?;

        // Amounts live in TEXT columns; the sign filter runs on parsed
        // decimals rather than on a lossy SQL cast.
        if let Some(direction) = direction {
            transactions.retain(|t| direction.matches(t.amount));
        }

        Ok(transactions)
    }

    async fn sum_amounts_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        currency: Option<Currency>,
        status: Option<TransactionStatus>,
        direction: Option<TransactionDirection>,
    ) -> Result<Decimal, RepoError> {
        let transactions = self
            .list_transactions_between(start, end, status, direction)
            .await?;

        // Summed in decimal space for the same reason the sign filter is.
        Ok(transactions
            .into_iter()
            .filter(|t| currency.is_none_or(|c| t.currency == c))
            .map(|t| t.amount)
            .sum())
    }
}
