//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use ledger_types::{
        Currency, DomainError, LedgerRepository, RepoError, TransactionDirection, TransactionId,
        TransactionStatus, UserFilter, UserId, UserStatus,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user_initializes_all_balances() {
        let repo = setup_repo().await;

        let (user, balances) = repo.create_user("alice@example.com").await.unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(balances.len(), Currency::ALL.len());
        assert!(balances.iter().all(|b| b.amount == Decimal::ZERO));

        let stored = repo.list_balances(user.id).await.unwrap();
        assert_eq!(stored.len(), Currency::ALL.len());
        let currencies: Vec<_> = stored.iter().map(|b| b.currency).collect();
        assert_eq!(currencies, Currency::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email_conflict() {
        let repo = setup_repo().await;

        repo.create_user("dup@example.com").await.unwrap();
        let result = repo.create_user("dup@example.com").await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));

        let users = repo.list_users(&UserFilter::default()).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_user(UserId::from_i64(999)).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_users_with_filters() {
        let repo = setup_repo().await;

        let (alice, _) = repo.create_user("alice@example.com").await.unwrap();
        let (bob, _) = repo.create_user("bob@example.com").await.unwrap();
        repo.update_user_status(bob.id, UserStatus::Blocked)
            .await
            .unwrap();

        let blocked = repo
            .list_users(&UserFilter {
                status: Some(UserStatus::Blocked),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].id, bob.id);

        let by_email = repo
            .list_users(&UserFilter {
                email: Some("alice@example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, alice.id);
    }

    #[tokio::test]
    async fn test_update_user_status() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("status@example.com").await.unwrap();
        let updated = repo
            .update_user_status(user.id, UserStatus::Blocked)
            .await
            .unwrap();

        assert_eq!(updated.status, UserStatus::Blocked);

        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, UserStatus::Blocked);
    }

    #[tokio::test]
    async fn test_update_user_status_not_found() {
        let repo = setup_repo().await;

        let result = repo
            .update_user_status(UserId::from_i64(999), UserStatus::Blocked)
            .await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_post_deposit_updates_balance() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("deposit@example.com").await.unwrap();
        let tx = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(10050, 2))
            .await
            .unwrap();

        assert_eq!(tx.user_id, user.id);
        assert_eq!(tx.amount, Decimal::new(10050, 2));
        assert_eq!(tx.status, TransactionStatus::Posted);

        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::new(10050, 2));

        let fetched = repo.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(fetched.amount, Decimal::new(10050, 2));
        assert_eq!(fetched.status, TransactionStatus::Posted);
    }

    #[tokio::test]
    async fn test_post_withdrawal_updates_balance() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("withdraw@example.com").await.unwrap();
        repo.post_transaction(user.id, Currency::USD, Decimal::new(10050, 2))
            .await
            .unwrap();

        let tx = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(-5025, 2))
            .await
            .unwrap();

        assert_eq!(tx.amount, Decimal::new(-5025, 2));

        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::new(5025, 2));
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_side_effects() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("overdraft@example.com").await.unwrap();
        repo.post_transaction(user.id, Currency::USD, Decimal::new(10050, 2))
            .await
            .unwrap();

        let result = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(-20000, 2))
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InsufficientBalance { .. }))
        ));

        // Balance untouched and no orphan record written
        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::new(10050, 2));

        let transactions = repo
            .list_transactions_for_user(user.id, 0, 100)
            .await
            .unwrap();
        assert_eq!(transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_post_transaction_missing_balance_row() {
        let repo = setup_repo().await;

        let result = repo
            .post_transaction(UserId::from_i64(999), Currency::USD, Decimal::new(100, 0))
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::BalanceNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reverse_restores_balance() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("reverse@example.com").await.unwrap();
        let tx = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(10050, 2))
            .await
            .unwrap();

        let reversed = repo.reverse_transaction(tx.id).await.unwrap();

        assert_eq!(reversed.status, TransactionStatus::Reversed);
        assert_eq!(reversed.amount, Decimal::new(10050, 2));

        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::ZERO);

        let fetched = repo.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TransactionStatus::Reversed);
    }

    #[tokio::test]
    async fn test_reverse_twice_rejected() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("double@example.com").await.unwrap();
        let tx = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(10050, 2))
            .await
            .unwrap();

        repo.reverse_transaction(tx.id).await.unwrap();
        let result = repo.reverse_transaction(tx.id).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(
                DomainError::TransactionAlreadyReversed(_)
            ))
        ));

        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_reverse_missing_transaction() {
        let repo = setup_repo().await;

        let result = repo.reverse_transaction(TransactionId::from_i64(999)).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::TransactionNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_reverse_blocked_by_spent_funds() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("spent@example.com").await.unwrap();
        let deposit = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(10000, 2))
            .await
            .unwrap();
        repo.post_transaction(user.id, Currency::USD, Decimal::new(-8000, 2))
            .await
            .unwrap();

        // Undoing the deposit would overdraw what is left
        let result = repo.reverse_transaction(deposit.id).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InsufficientBalance { .. }))
        ));

        // The whole step rolled back: balance and record are unchanged
        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::new(2000, 2));

        let fetched = repo.get_transaction(deposit.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TransactionStatus::Posted);
    }

    #[tokio::test]
    async fn test_list_transactions_ordering_and_pagination() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("page@example.com").await.unwrap();
        for amount in 1..=5 {
            repo.post_transaction(user.id, Currency::USD, Decimal::new(amount, 0))
                .await
                .unwrap();
        }

        let all = repo
            .list_transactions_for_user(user.id, 0, 100)
            .await
            .unwrap();
        let amounts: Vec<_> = all.iter().map(|t| t.amount).collect();
        assert_eq!(
            amounts,
            vec![
                Decimal::new(5, 0),
                Decimal::new(4, 0),
                Decimal::new(3, 0),
                Decimal::new(2, 0),
                Decimal::new(1, 0)
            ]
        );

        let page = repo.list_transactions_for_user(user.id, 1, 2).await.unwrap();
        let amounts: Vec<_> = page.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![Decimal::new(4, 0), Decimal::new(3, 0)]);
    }

    #[tokio::test]
    async fn test_balance_equals_sum_of_posted_amounts() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("conserve@example.com").await.unwrap();
        repo.post_transaction(user.id, Currency::BTC, Decimal::new(3_00000000, 8))
            .await
            .unwrap();
        let spent = repo
            .post_transaction(user.id, Currency::BTC, Decimal::new(-1_25000000, 8))
            .await
            .unwrap();
        repo.post_transaction(user.id, Currency::BTC, Decimal::new(50000000, 8))
            .await
            .unwrap();
        repo.reverse_transaction(spent.id).await.unwrap();

        let posted_sum: Decimal = repo
            .list_transactions_for_user(user.id, 0, 100)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.status == TransactionStatus::Posted)
            .map(|t| t.amount)
            .sum();

        let balance = repo
            .get_balance(user.id, Currency::BTC)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, posted_sum);
        assert_eq!(balance.amount, Decimal::new(3_50000000, 8));
    }

    #[tokio::test]
    async fn test_concurrent_deposits_lose_no_updates() {
        let repo = Arc::new(setup_repo().await);

        let (user, _) = repo.create_user("race@example.com").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = Arc::clone(&repo);
            let user_id = user.id;
            handles.push(tokio::spawn(async move {
                repo.post_transaction(user_id, Currency::USD, Decimal::new(100, 2))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let balance = repo
            .get_balance(user.id, Currency::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(balance.amount, Decimal::new(800, 2));
    }

    #[tokio::test]
    async fn test_window_queries() {
        let repo = setup_repo().await;

        let (user, _) = repo.create_user("window@example.com").await.unwrap();
        repo.post_transaction(user.id, Currency::USD, Decimal::new(10000, 2))
            .await
            .unwrap();
        let withdrawal = repo
            .post_transaction(user.id, Currency::USD, Decimal::new(-4000, 2))
            .await
            .unwrap();
        repo.reverse_transaction(withdrawal.id).await.unwrap();

        let start = Utc::now() - Duration::hours(1);
        let end = Utc::now() + Duration::hours(1);

        let total = repo
            .count_transactions_between(start, end, None)
            .await
            .unwrap();
        assert_eq!(total, 2);

        let posted = repo
            .count_transactions_between(start, end, Some(TransactionStatus::Posted))
            .await
            .unwrap();
        assert_eq!(posted, 1);

        let deposits = repo
            .list_transactions_between(start, end, None, Some(TransactionDirection::Deposits))
            .await
            .unwrap();
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].amount, Decimal::new(10000, 2));

        let posted_sum = repo
            .sum_amounts_between(start, end, None, Some(TransactionStatus::Posted), None)
            .await
            .unwrap();
        assert_eq!(posted_sum, Decimal::new(10000, 2));

        let eur_sum = repo
            .sum_amounts_between(start, end, Some(Currency::EUR), None, None)
            .await
            .unwrap();
        assert_eq!(eur_sum, Decimal::ZERO);

        let empty_window = repo
            .count_transactions_between(start - Duration::days(30), start, None)
            .await
            .unwrap();
        assert_eq!(empty_window, 0);
    }

    #[tokio::test]
    async fn test_list_users_registered_between() {
        let repo = setup_repo().await;

        repo.create_user("recent@example.com").await.unwrap();

        let now = Utc::now();
        let this_hour = repo
            .list_users_registered_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(this_hour.len(), 1);

        let last_year = repo
            .list_users_registered_between(now - Duration::days(365), now - Duration::days(300))
            .await
            .unwrap();
        assert!(last_year.is_empty());
    }
}
