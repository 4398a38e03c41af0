//! Ledger Application Service
//!
//! Orchestrates domain operations through the repository port.
//! Contains NO infrastructure logic - pure business orchestration.

use ledger_types::{
    AppError, CreateUserRequest, DomainError, LedgerRepository, NewTransactionRequest,
    Transaction, TransactionId, UserDetailResponse, UserFilter, UserId, UserResponse, UserStatus,
};

/// Application service for ledger operations.
///
/// Generic over `R: LedgerRepository` - the adapter is injected at compile
/// time. This enables:
/// - Swapping repositories without code changes
/// - Testing with an in-memory repo
/// - Compile-time checks for port implementation
pub struct LedgerService<R: LedgerRepository> {
    repo: R,
}

impl<R: LedgerRepository> LedgerService<R> {
    /// Creates a new ledger service with the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a new user with a zero balance for every supported currency.
    pub async fn create_user(
        &self,
        req: CreateUserRequest,
    ) -> Result<UserDetailResponse, AppError> {
        let email = normalize_email(&req.email)?;

        if self.repo.email_exists(&email).await? {
            tracing::warn!(email = %email, "duplicate email on user creation");
            return Err(DomainError::UserAlreadyExists { email }.into());
        }

        let (user, balances) = self.repo.create_user(&email).await?;
        tracing::info!(user_id = %user.id, "user registered");

        Ok(UserDetailResponse::new(user, balances))
    }

    /// Gets a user by id, with balances.
    pub async fn get_user(&self, id: UserId) -> Result<UserDetailResponse, AppError> {
        let user = self
            .repo
            .get_user(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))?;

        let balances = self.repo.list_balances(id).await?;
        Ok(UserDetailResponse::new(user, balances))
    }

    /// Lists users matching the filter, with balances.
    pub async fn list_users(
        &self,
        filter: &UserFilter,
    ) -> Result<Vec<UserDetailResponse>, AppError> {
        let users = self.repo.list_users(filter).await?;

        let mut result = Vec::with_capacity(users.len());
        for user in users {
            let balances = self.repo.list_balances(user.id).await?;
            result.push(UserDetailResponse::new(user, balances));
        }
        Ok(result)
    }

    /// Changes a user's status, rejecting redundant transitions.
    pub async fn update_user_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<UserResponse, AppError> {
        let user = self
            .repo
            .get_user(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))?;

        if user.status == status {
            return Err(match status {
                UserStatus::Blocked => DomainError::UserAlreadyBlocked(id),
                UserStatus::Active => DomainError::UserAlreadyActive(id),
            }
            .into());
        }

        let updated = self.repo.update_user_status(id, status).await?;
        tracing::info!(user_id = %id, status = %updated.status, "user status updated");

        Ok(updated.into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Core
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a deposit (positive amount) or withdrawal (negative amount)
    /// for the user, atomically coupling the balance delta to the record.
    pub async fn create_transaction(
        &self,
        user_id: UserId,
        data: NewTransactionRequest,
    ) -> Result<Transaction, AppError> {
        tracing::info!(
            user_id = %user_id,
            currency = %data.currency,
            amount = %data.amount,
            "attempting to create transaction"
        );

        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "user not found for transaction creation");
                DomainError::UserNotFound(user_id)
            })?;

        if user.is_blocked() {
            tracing::warn!(user_id = %user_id, "blocked user attempted transaction creation");
            return Err(DomainError::UserBlocked {
                user_id,
                operation: "create transaction".to_string(),
            }
            .into());
        }

        let balance = self
            .repo
            .get_balance(user_id, data.currency)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    user_id = %user_id,
                    currency = %data.currency,
                    "balance row missing for existing user"
                );
                DomainError::BalanceNotFound {
                    user_id,
                    currency: data.currency,
                }
            })?;

        // Pre-check before touching storage; the repository re-validates the
        // same projection inside the store transaction.
        if let Err(e) = balance.project(data.amount) {
            tracing::warn!(
                user_id = %user_id,
                current = %balance.amount,
                requested = %data.amount,
                "negative balance prevented transaction"
            );
            return Err(e.into());
        }

        let transaction = self
            .repo
            .post_transaction(user_id, data.currency, data.amount)
            .await?;

        tracing::info!(
            transaction_id = %transaction.id,
            user_id = %user_id,
            "transaction created and posted"
        );

        Ok(transaction)
    }

    /// Reverses a posted transaction, undoing its balance effect exactly once.
    pub async fn reverse_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, AppError> {
        tracing::info!(
            user_id = %user_id,
            transaction_id = %transaction_id,
            "attempting to rollback transaction"
        );

        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "user not found for rollback");
                DomainError::UserNotFound(user_id)
            })?;

        if user.is_blocked() {
            tracing::warn!(user_id = %user_id, "blocked user attempted rollback");
            return Err(DomainError::UserBlocked {
                user_id,
                operation: "rollback transaction".to_string(),
            }
            .into());
        }

        let transaction = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(transaction_id = %transaction_id, "transaction not found for rollback");
                DomainError::TransactionNotFound(transaction_id)
            })?;

        if transaction.user_id != user_id {
            tracing::error!(
                transaction_id = %transaction_id,
                user_id = %user_id,
                owner_id = %transaction.user_id,
                "access denied: transaction does not belong to user"
            );
            return Err(DomainError::TransactionOwnershipMismatch {
                transaction_id,
                user_id,
            }
            .into());
        }

        if transaction.is_reversed() {
            tracing::warn!(transaction_id = %transaction_id, "transaction already rolled back");
            return Err(DomainError::TransactionAlreadyReversed(transaction_id).into());
        }

        let balance = self
            .repo
            .get_balance(user_id, transaction.currency)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    user_id = %user_id,
                    currency = %transaction.currency,
                    "balance row missing for existing user"
                );
                DomainError::BalanceNotFound {
                    user_id,
                    currency: transaction.currency,
                }
            })?;

        // A reversal can overdraw the balance if the deposited funds were
        // spent since; pre-checked here and re-validated by the repository.
        if let Err(e) = balance.project(transaction.reversal_amount()) {
            tracing::warn!(
                user_id = %user_id,
                transaction_id = %transaction_id,
                current = %balance.amount,
                reverse_amount = %transaction.reversal_amount(),
                "negative balance prevented rollback"
            );
            return Err(e.into());
        }

        let updated = self.repo.reverse_transaction(transaction_id).await?;

        tracing::info!(
            transaction_id = %updated.id,
            user_id = %user_id,
            "transaction rolled back"
        );

        Ok(updated)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction History
    // ─────────────────────────────────────────────────────────────────────────

    /// Gets a transaction by id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| DomainError::TransactionNotFound(id).into())
    }

    /// Lists transactions, optionally scoped to one user, newest first.
    pub async fn list_transactions(
        &self,
        user_id: Option<UserId>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        let transactions = match user_id {
            Some(user_id) => {
                self.repo
                    .list_transactions_for_user(user_id, skip, limit)
                    .await?
            }
            None => self.repo.list_transactions(skip, limit).await?,
        };

        tracing::debug!(count = transactions.len(), "fetched transactions");
        Ok(transactions)
    }
}

/// Trims and shape-checks an email address.
fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(DomainError::ValidationError("Email cannot be empty".into()));
    }

    let well_formed = !email.chars().any(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        });

    if !well_formed {
        return Err(DomainError::ValidationError(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn test_normalize_email_trims() {
        assert_eq!(
            normalize_email("  a@example.com  ").unwrap(),
            "a@example.com"
        );
    }

    #[test]
    fn test_normalize_email_rejects_empty() {
        assert!(normalize_email("   ").is_err());
    }

    #[test]
    fn test_normalize_email_rejects_malformed() {
        for bad in ["plain", "@example.com", "a@nodot", "a@b..com", "a b@c.com", "a@b@c.com"] {
            assert!(normalize_email(bad).is_err(), "accepted {bad:?}");
        }
    }
}
