//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ledger_types::{
    Balance, Currency, DomainError, LedgerRepository, RepoError, Transaction,
    TransactionDirection, TransactionId, TransactionStatus, User, UserFilter, UserId, UserStatus,
};

use crate::types::{DbBalance, DbTransaction, DbUser};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
///
/// Balance rows (and the transaction row during a reversal) are read with
/// `SELECT ... FOR UPDATE`, so concurrent delta applications on the same
/// (user, currency) pair serialize at the store instead of losing updates.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        execute_migration(
            &pool,
            include_str!("../migrations/0001_create_tables_pg.sql"),
            "0001",
        )
        .await?;
        tracing::debug!("PostgreSQL migrations applied");
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
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
impl LedgerRepository for PostgresRepo {
    async fn create_user(&self, email: &str) -> Result<(User, Vec<Balance>), RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        let (user_id, created): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"INSERT INTO users (email, status) VALUES ($1, 'ACTIVE') RETURNING id, created"#,
        )
        .bind(email)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(|e| insert_user_err(e, email))?;

        let user_id = UserId::from_i64(user_id);

        let mut balances = Vec::with_capacity(Currency::ALL.len());
        for currency in Currency::ALL {
            sqlx::query(r#"INSERT INTO balances (user_id, currency, amount) VALUES ($1, $2, 0)"#)
                .bind(user_id.get())
                .bind(currency.code())
                .execute(&mut *db_tx)
                .await
                .map_err(db_err)?;
            balances.push(Balance::zero(user_id, currency));
        }

        db_tx.commit().await.map_err(tx_err)?;

        Ok((
            User::from_parts(user_id, email.to_string(), UserStatus::Active, created),
            balances,
        ))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(r#"SELECT id, email, status, created FROM users WHERE id = $1"#)
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
               WHERE ($1::BIGINT IS NULL OR id = $1)
                 AND ($2::TEXT IS NULL OR email = $2)
                 AND ($3::TEXT IS NULL OR status = $3)
               ORDER BY created DESC, id DESC"#,
        )
        .bind(user_id)
        .bind(email)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbUser::into_domain).collect()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE email = $1"#)
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
        let row: Option<DbUser> = sqlx::query_as(
            r#"UPDATE users SET status = $1 WHERE id = $2
               RETURNING id, email, status, created"#,
        )
        .bind(status.as_str())
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.ok_or(RepoError::NotFound)?.into_domain()
    }

    async fn list_users_registered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<User>, RepoError> {
        let rows: Vec<DbUser> = sqlx::query_as(
            r#"SELECT id, email, status, created FROM users
               WHERE created >= $1 AND created <= $2"#,
        )
        .bind(start)
        .bind(end)
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
               WHERE user_id = $1 AND currency = $2"#,
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
               WHERE user_id = $1 ORDER BY id"#,
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

        // Lock the balance row for the duration of the store transaction
        let row: Option<DbBalance> = sqlx::query_as(
            r#"SELECT user_id, currency, amount FROM balances
               WHERE user_id = $1 AND currency = $2 FOR UPDATE"#,
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

        // Re-validated here, under the row lock, even though the service
        // pre-checked: the pre-check read was unlocked.
        let new_amount = balance.project(amount).map_err(RepoError::Domain)?;

        sqlx::query(r#"UPDATE balances SET amount = $1 WHERE user_id = $2 AND currency = $3"#)
            .bind(new_amount)
            .bind(user_id.get())
            .bind(currency.code())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        let now = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO transactions (user_id, currency, amount, status, created)
               VALUES ($1, $2, $3, 'POSTED', $4) RETURNING id"#,
        )
        .bind(user_id.get())
        .bind(currency.code())
        .bind(amount)
        .bind(now)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(db_err)?;

        db_tx.commit().await.map_err(tx_err)?;

        Ok(Transaction::from_parts(
            TransactionId::from_i64(id),
            user_id,
            currency,
            amount,
            TransactionStatus::Posted,
            now,
        ))
    }

    async fn reverse_transaction(&self, id: TransactionId) -> Result<Transaction, RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        // Lock the record so two concurrent reversals cannot both see POSTED
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions WHERE id = $1 FOR UPDATE"#,
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
               WHERE user_id = $1 AND currency = $2 FOR UPDATE"#,
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

        sqlx::query(r#"UPDATE balances SET amount = $1 WHERE user_id = $2 AND currency = $3"#)
            .bind(new_amount)
            .bind(transaction.user_id.get())
            .bind(transaction.currency.code())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        sqlx::query(r#"UPDATE transactions SET status = 'REVERSED' WHERE id = $1"#)
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
               FROM transactions WHERE id = $1"#,
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
               FROM transactions WHERE user_id = $1
               ORDER BY created DESC, id DESC
               LIMIT $2 OFFSET $3"#,
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
               LIMIT $1 OFFSET $2"#,
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
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM transactions
               WHERE created >= $1 AND created <= $2
                 AND ($3::TEXT IS NULL OR status = $3)"#,
        )
        .bind(start)
        .bind(end)
        .bind(status.map(|s| s.as_str()))
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
        let rows: Vec<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, currency, amount, status, created
               FROM transactions
               WHERE created >= $1 AND created <= $2
                 AND ($3::TEXT IS NULL OR status = $3)
                 AND ($4::TEXT IS NULL
                      OR ($4 = 'DEPOSITS' AND amount > 0)
                      OR ($4 = 'WITHDRAWALS' AND amount < 0))
               ORDER BY created DESC, id DESC"#,
        )
        .bind(start)
        .bind(end)
        .bind(status.map(|s| s.as_str()))
        .bind(direction.map(direction_tag))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn sum_amounts_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        currency: Option<Currency>,
        status: Option<TransactionStatus>,
        direction: Option<TransactionDirection>,
    ) -> Result<Decimal, RepoError> {
        let sum: Decimal = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(amount), 0) FROM transactions
               WHERE created >= $1 AND created <= $2
                 AND ($3::TEXT IS NULL OR currency = $3)
                 AND ($4::TEXT IS NULL OR status = $4)
                 AND ($5::TEXT IS NULL
                      OR ($5 = 'DEPOSITS' AND amount > 0)
                      OR ($5 = 'WITHDRAWALS' AND amount < 0))"#,
        )
        .bind(start)
        .bind(end)
        .bind(currency.map(|c| c.code()))
        .bind(status.map(|s| s.as_str()))
        .bind(direction.map(direction_tag))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(sum)
    }
}

fn direction_tag(direction: TransactionDirection) -> &'static str {
    match direction {
        TransactionDirection::Deposits => "DEPOSITS",
        TransactionDirection::Withdrawals => "WITHDRAWALS",
    }
}
