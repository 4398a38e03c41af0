//! Weekly aggregate report generation.
//!
//! Walks consecutive 7-day windows back from now and aggregates the window's
//! registrations, deposits and withdrawals; volume totals are converted to
//! USD with the static rate table.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use ledger_types::{
    AppError, LedgerRepository, Transaction, TransactionDirection, TransactionStatus, UserId,
    WeeklyReport,
};

use crate::service::LedgerService;

impl<R: LedgerRepository> LedgerService<R> {
    /// Generates weekly reports for the last `weeks` weeks, newest first.
    ///
    /// Weeks without any activity are skipped.
    pub async fn generate_weekly_report(&self, weeks: u32) -> Result<Vec<WeeklyReport>, AppError> {
        tracing::info!(weeks, "starting weekly report generation");

        let mut end = Utc::now();
        let mut reports = Vec::new();

        for week in 0..weeks {
            let start = end - Duration::days(7);

            let report = self.weekly_window_report(start, end).await?;
            if report.has_activity() {
                tracing::debug!(
                    week = week + 1,
                    start = %report.start_date,
                    end = %report.end_date,
                    "week has activity"
                );
                reports.push(report);
            }

            end = start;
        }

        tracing::info!(
            weeks_with_activity = reports.len(),
            "finished weekly report generation"
        );

        Ok(reports)
    }

    /// Aggregates one report window.
    async fn weekly_window_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WeeklyReport, AppError> {
        let repo = self.repo();

        let registered = repo.list_users_registered_between(start, end).await?;
        let registered_ids: HashSet<UserId> = registered.iter().map(|u| u.id).collect();

        let deposits_all = repo
            .list_transactions_between(start, end, None, Some(TransactionDirection::Deposits))
            .await?;
        let deposits_posted = repo
            .list_transactions_between(
                start,
                end,
                Some(TransactionStatus::Posted),
                Some(TransactionDirection::Deposits),
            )
            .await?;
        let withdrawals_posted = repo
            .list_transactions_between(
                start,
                end,
                Some(TransactionStatus::Posted),
                Some(TransactionDirection::Withdrawals),
            )
            .await?;

        let total_transactions = repo.count_transactions_between(start, end, None).await?;
        let posted_transactions = repo
            .count_transactions_between(start, end, Some(TransactionStatus::Posted))
            .await?;

        Ok(WeeklyReport {
            start_date: start.date_naive(),
            end_date: end.date_naive(),
            registered_users_count: registered.len() as u64,
            users_with_deposits_count: distinct_owners(&deposits_all, &registered_ids),
            users_with_posted_deposits_count: distinct_owners(&deposits_posted, &registered_ids),
            users_with_posted_withdrawals_count: distinct_owners(
                &withdrawals_posted,
                &registered_ids,
            ),
            total_deposits_usd: usd_volume(&deposits_posted),
            total_withdrawals_usd: usd_volume(&withdrawals_posted).abs(),
            total_transactions_count: total_transactions as u64,
            posted_transactions_count: posted_transactions as u64,
        })
    }
}

/// Counts distinct transaction owners among the given (newly registered) users.
fn distinct_owners(transactions: &[Transaction], registered_ids: &HashSet<UserId>) -> u64 {
    transactions
        .iter()
        .filter(|t| registered_ids.contains(&t.user_id))
        .map(|t| t.user_id)
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Sums transaction amounts converted to USD.
fn usd_volume(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .map(|t| fx_rates::to_usd(t.amount, t.currency.code()))
        .sum()
}
