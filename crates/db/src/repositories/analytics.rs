//! Analytics repository for admin reporting.
//!
//! PostgreSQL does the grouping; `corebank_core::analytics` shapes the rows.
//! Transaction volumes only count `completed` rows, so a reversed original
//! drops out while its reversal entry shows up under reversals.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use corebank_core::analytics::{
    self, AccountGrowth, AccountStats, AnalyticsOverview, AnalyticsPeriod, LoanStats,
    LoanStatusBreakdown, MonthKey, MonthlyTrend, TransactionStats, TypeTotal, UserStats,
};
use corebank_core::ledger::TransactionType as DomainType;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};

use super::error::RepoResult;
use crate::entities::{
    accounts, loans,
    sea_orm_active_enums::{AccountStatus, LoanStatus, TransactionStatus, TransactionType},
    transactions, users,
};

const YEAR_OF_CREATED: &str = "EXTRACT(YEAR FROM created_at)::int";
const MONTH_OF_CREATED: &str = "EXTRACT(MONTH FROM created_at)::int";
const YEAR_OF_OPENED: &str = "EXTRACT(YEAR FROM opened_at)::int";
const MONTH_OF_OPENED: &str = "EXTRACT(MONTH FROM opened_at)::int";

/// Analytics repository.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    db: DatabaseConnection,
}

impl AnalyticsRepository {
    /// Creates a new analytics repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Overview for the window ending at `now`.
    ///
    /// Transaction volume and new users are limited to the window; account
    /// and loan figures are all-time.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn overview(
        &self,
        period: AnalyticsPeriod,
        now: DateTime<Utc>,
    ) -> RepoResult<AnalyticsOverview> {
        let start = period.window_start(now);

        let totals = self.type_totals(start, now).await?;
        let transactions = TransactionStats::from_totals(&totals);
        let accounts = self.account_stats().await?;
        let loans = LoanStats::from_breakdown(&self.loan_rows().await?);
        let users = self.user_stats(start).await?;

        tracing::debug!(%period, %start, "Analytics overview computed");

        Ok(AnalyticsOverview {
            period,
            period_start: start,
            period_end: now,
            transactions,
            accounts,
            loans,
            users,
        })
    }

    /// Completed transaction volume per type and month over the last 12
    /// months, zero-filled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn monthly_trends(&self, now: DateTime<Utc>) -> RepoResult<Vec<MonthlyTrend>> {
        let start = window_start(now);

        let rows: Vec<(i32, i32, TransactionType, Option<Decimal>)> = transactions::Entity::find()
            .select_only()
            .column_as(Expr::cust(YEAR_OF_CREATED), "year")
            .column_as(Expr::cust(MONTH_OF_CREATED), "month")
            .column(transactions::Column::TransactionType)
            .column_as(Expr::col(transactions::Column::Amount).sum(), "total")
            .filter(transactions::Column::Status.eq(TransactionStatus::Completed))
            .filter(transactions::Column::CreatedAt.gte(start))
            .group_by(Expr::cust(YEAR_OF_CREATED))
            .group_by(Expr::cust(MONTH_OF_CREATED))
            .group_by(transactions::Column::TransactionType)
            .into_tuple()
            .all(&self.db)
            .await?;

        let rows: Vec<(MonthKey, DomainType, Decimal)> = rows
            .into_iter()
            .filter_map(|(year, month, tx_type, total)| {
                Some((month_key(year, month)?, tx_type.into(), total.unwrap_or_default()))
            })
            .collect();

        Ok(analytics::monthly_trends(now, &rows))
    }

    /// Accounts opened per month over the last 12 months, with running totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn account_growth(&self, now: DateTime<Utc>) -> RepoResult<Vec<AccountGrowth>> {
        let start = window_start(now);

        let before = accounts::Entity::find()
            .filter(accounts::Column::OpenedAt.lt(start))
            .count(&self.db)
            .await?;

        let rows: Vec<(i32, i32, i64)> = accounts::Entity::find()
            .select_only()
            .column_as(Expr::cust(YEAR_OF_OPENED), "year")
            .column_as(Expr::cust(MONTH_OF_OPENED), "month")
            .column_as(Expr::col(accounts::Column::Id).count(), "count")
            .filter(accounts::Column::OpenedAt.gte(start))
            .group_by(Expr::cust(YEAR_OF_OPENED))
            .group_by(Expr::cust(MONTH_OF_OPENED))
            .into_tuple()
            .all(&self.db)
            .await?;

        let rows: Vec<(MonthKey, i64)> = rows
            .into_iter()
            .filter_map(|(year, month, count)| Some((month_key(year, month)?, count)))
            .collect();

        Ok(analytics::account_growth(
            now,
            i64::try_from(before).unwrap_or(i64::MAX),
            &rows,
        ))
    }

    /// One row per loan status with counts and sums, zero-filled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn loan_breakdown(&self) -> RepoResult<Vec<LoanStatusBreakdown>> {
        let rows = self.loan_rows().await?;
        Ok(analytics::loan_status_breakdown(&rows))
    }

    async fn type_totals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<TypeTotal>> {
        let rows: Vec<(TransactionType, i64, Option<Decimal>)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::TransactionType)
            .column_as(Expr::col(transactions::Column::Id).count(), "count")
            .column_as(Expr::col(transactions::Column::Amount).sum(), "total")
            .filter(transactions::Column::Status.eq(TransactionStatus::Completed))
            .filter(transactions::Column::CreatedAt.gte(start))
            .filter(transactions::Column::CreatedAt.lte(end))
            .group_by(transactions::Column::TransactionType)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(transaction_type, count, total)| TypeTotal {
                transaction_type: transaction_type.into(),
                count,
                total: total.unwrap_or_default(),
            })
            .collect())
    }

    async fn account_stats(&self) -> RepoResult<AccountStats> {
        let rows: Vec<(AccountStatus, i64, Option<Decimal>)> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Status)
            .column_as(Expr::col(accounts::Column::Id).count(), "count")
            .column_as(Expr::col(accounts::Column::Balance).sum(), "balance")
            .group_by(accounts::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut stats = AccountStats::default();
        for (status, count, balance) in rows {
            stats.total += count;
            stats.total_balance += balance.unwrap_or_default();
            match status {
                AccountStatus::Active => stats.active += count,
                AccountStatus::Frozen => stats.frozen += count,
                AccountStatus::Closed => stats.closed += count,
            }
        }
        Ok(stats)
    }

    async fn loan_rows(&self) -> RepoResult<Vec<LoanStatusBreakdown>> {
        let rows: Vec<(LoanStatus, i64, Option<Decimal>, Option<Decimal>)> = loans::Entity::find()
            .select_only()
            .column(loans::Column::Status)
            .column_as(Expr::col(loans::Column::Id).count(), "count")
            .column_as(Expr::col(loans::Column::Principal).sum(), "principal")
            .column_as(Expr::col(loans::Column::OutstandingBalance).sum(), "outstanding")
            .group_by(loans::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count, principal, outstanding)| LoanStatusBreakdown {
                status: status.into(),
                count,
                total_principal: principal.unwrap_or_default(),
                total_outstanding: outstanding.unwrap_or_default(),
            })
            .collect())
    }

    async fn user_stats(&self, since: DateTime<Utc>) -> RepoResult<UserStats> {
        let total = users::Entity::find().count(&self.db).await?;
        let active = users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        let new_in_period = users::Entity::find()
            .filter(users::Column::CreatedAt.gte(since))
            .count(&self.db)
            .await?;

        Ok(UserStats {
            total: to_i64(total),
            active: to_i64(active),
            new_in_period: to_i64(new_in_period),
        })
    }
}

/// First instant of the oldest month in the 12-month window.
fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    analytics::last_twelve_months(now)
        .first()
        .and_then(|key| Utc.with_ymd_and_hms(key.year, key.month, 1, 0, 0, 0).single())
        .unwrap_or_else(|| {
            Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(now)
        })
}

fn month_key(year: i32, month: i32) -> Option<MonthKey> {
    let month = u32::try_from(month).ok().filter(|m| (1..=12).contains(m))?;
    Some(MonthKey { year, month })
}

fn to_i64(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_starts_eleven_months_back_on_the_first() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 10, 30, 0).unwrap();
        let start = window_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_key_rejects_out_of_range() {
        assert_eq!(month_key(2025, 0), None);
        assert_eq!(month_key(2025, 13), None);
        assert_eq!(month_key(2025, 7), Some(MonthKey { year: 2025, month: 7 }));
    }
}
