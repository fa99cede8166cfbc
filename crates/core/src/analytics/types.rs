//! Analytics data types.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::TransactionType;
use crate::loan::LoanStatus;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

text_enum! {
    /// Look-back window for the overview.
    AnalyticsPeriod {
        /// Last 7 days.
        Week => "week",
        /// Last calendar month.
        Month => "month",
        /// Last 12 months.
        Year => "year",
    }
}

impl Default for AnalyticsPeriod {
    fn default() -> Self {
        Self::Month
    }
}

impl AnalyticsPeriod {
    /// Start of the window ending at `now`.
    #[must_use]
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = match self {
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => now.checked_sub_months(Months::new(1)),
            Self::Year => now.checked_sub_months(Months::new(12)),
        };
        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    /// Year.
    pub year: i32,
    /// Month (1-12).
    pub month: u32,
}

impl MonthKey {
    /// Month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Short label such as `Mar 2025`.
    #[must_use]
    pub fn label(self) -> String {
        let name = MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        format!("{name} {}", self.year)
    }
}

/// The 12 months ending with the month of `now`, oldest first.
#[must_use]
pub fn last_twelve_months(now: DateTime<Utc>) -> Vec<MonthKey> {
    let current = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    (0..12u32)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(MonthKey::of)
        .collect()
}

/// Count and sum for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeTotal {
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Number of transactions.
    pub count: i64,
    /// Sum of amounts.
    pub total: Decimal,
}

/// Transaction volume in a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    /// Deposits.
    pub total_deposits: Decimal,
    /// Withdrawals.
    pub total_withdrawals: Decimal,
    /// Transfers, counted once on the outgoing leg.
    pub total_transfers: Decimal,
    /// Loan disbursements.
    pub total_loan_disbursements: Decimal,
    /// EMI collections.
    pub total_emi_collections: Decimal,
    /// Reversal entries.
    pub total_reversals: Decimal,
    /// Number of transactions (transfers count once).
    pub transaction_count: i64,
}

impl TransactionStats {
    /// Folds per-type totals into the overview numbers.
    #[must_use]
    pub fn from_totals(totals: &[TypeTotal]) -> Self {
        let mut stats = Self::default();
        for t in totals {
            match t.transaction_type {
                TransactionType::Deposit => stats.total_deposits += t.total,
                TransactionType::Withdrawal => stats.total_withdrawals += t.total,
                TransactionType::TransferOut => stats.total_transfers += t.total,
                TransactionType::LoanDisbursement => stats.total_loan_disbursements += t.total,
                TransactionType::EmiDeduction => stats.total_emi_collections += t.total,
                TransactionType::Reversal => stats.total_reversals += t.total,
                TransactionType::TransferIn => continue,
            }
            stats.transaction_count += t.count;
        }
        stats
    }
}

/// User counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    /// All users.
    pub total: i64,
    /// Active users.
    pub active: i64,
    /// Users registered inside the period.
    pub new_in_period: i64,
}

/// Account counts and deposits held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountStats {
    /// All accounts.
    pub total: i64,
    /// Active accounts.
    pub active: i64,
    /// Frozen accounts.
    pub frozen: i64,
    /// Closed accounts.
    pub closed: i64,
    /// Sum of all balances.
    pub total_balance: Decimal,
}

/// Loan counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoanStats {
    /// All loans.
    pub total: i64,
    /// Awaiting decision.
    pub requested: i64,
    /// Being repaid.
    pub active: i64,
    /// Missed an EMI.
    pub overdue: i64,
    /// Fully repaid.
    pub paid: i64,
    /// Declined.
    pub rejected: i64,
    /// Outstanding balance across active and overdue loans.
    pub total_outstanding: Decimal,
}

impl LoanStats {
    /// Builds loan counts from the status breakdown.
    #[must_use]
    pub fn from_breakdown(breakdown: &[LoanStatusBreakdown]) -> Self {
        let mut stats = Self::default();
        for row in breakdown {
            stats.total += row.count;
            match row.status {
                LoanStatus::Requested => stats.requested += row.count,
                LoanStatus::Active => stats.active += row.count,
                LoanStatus::Overdue => stats.overdue += row.count,
                LoanStatus::Paid => stats.paid += row.count,
                LoanStatus::Rejected => stats.rejected += row.count,
            }
            if row.status.is_repayable() {
                stats.total_outstanding += row.total_outstanding;
            }
        }
        stats
    }
}

/// Admin overview.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsOverview {
    /// Requested period.
    pub period: AnalyticsPeriod,
    /// Window start.
    pub period_start: DateTime<Utc>,
    /// Window end.
    pub period_end: DateTime<Utc>,
    /// Transaction volume in the window.
    pub transactions: TransactionStats,
    /// Accounts (all time).
    pub accounts: AccountStats,
    /// Loans (all time).
    pub loans: LoanStats,
    /// Users.
    pub users: UserStats,
}

/// Transaction volume for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTrend {
    /// Month.
    #[serde(flatten)]
    pub key: MonthKey,
    /// Label such as `Mar 2025`.
    pub label: String,
    /// Deposits.
    pub deposits: Decimal,
    /// Withdrawals.
    pub withdrawals: Decimal,
    /// Transfers (outgoing leg).
    pub transfers: Decimal,
    /// Loan disbursements.
    pub loan_disbursements: Decimal,
    /// EMI collections.
    pub emi_collections: Decimal,
}

impl MonthlyTrend {
    fn empty(key: MonthKey) -> Self {
        Self {
            key,
            label: key.label(),
            deposits: Decimal::ZERO,
            withdrawals: Decimal::ZERO,
            transfers: Decimal::ZERO,
            loan_disbursements: Decimal::ZERO,
            emi_collections: Decimal::ZERO,
        }
    }
}

/// Zero-filled monthly trends for the last 12 months.
///
/// `rows` holds `(month, type, sum)` groups; months outside the window are ignored.
#[must_use]
pub fn monthly_trends(
    now: DateTime<Utc>,
    rows: &[(MonthKey, TransactionType, Decimal)],
) -> Vec<MonthlyTrend> {
    let mut trends: Vec<MonthlyTrend> = last_twelve_months(now)
        .into_iter()
        .map(MonthlyTrend::empty)
        .collect();

    for (key, tx_type, total) in rows {
        let Some(trend) = trends.iter_mut().find(|t| t.key == *key) else {
            continue;
        };
        match tx_type {
            TransactionType::Deposit => trend.deposits += *total,
            TransactionType::Withdrawal => trend.withdrawals += *total,
            TransactionType::TransferOut => trend.transfers += *total,
            TransactionType::LoanDisbursement => trend.loan_disbursements += *total,
            TransactionType::EmiDeduction => trend.emi_collections += *total,
            TransactionType::TransferIn | TransactionType::Reversal => {}
        }
    }

    trends
}

/// New and cumulative accounts for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountGrowth {
    /// Month.
    #[serde(flatten)]
    pub key: MonthKey,
    /// Label such as `Mar 2025`.
    pub label: String,
    /// Accounts opened in the month.
    pub new_accounts: i64,
    /// Accounts opened up to the end of the month.
    pub total_accounts: i64,
}

/// Zero-filled account growth for the last 12 months.
///
/// `opened_before_window` is the number of accounts opened before the first
/// month of the window; `rows` holds per-month opening counts.
#[must_use]
pub fn account_growth(
    now: DateTime<Utc>,
    opened_before_window: i64,
    rows: &[(MonthKey, i64)],
) -> Vec<AccountGrowth> {
    let mut cumulative = opened_before_window;
    last_twelve_months(now)
        .into_iter()
        .map(|key| {
            let new_accounts: i64 = rows
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, count)| *count)
                .sum();
            cumulative += new_accounts;
            AccountGrowth {
                key,
                label: key.label(),
                new_accounts,
                total_accounts: cumulative,
            }
        })
        .collect()
}

/// Loans in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanStatusBreakdown {
    /// Status.
    pub status: LoanStatus,
    /// Number of loans.
    pub count: i64,
    /// Sum of principals.
    pub total_principal: Decimal,
    /// Sum of outstanding balances.
    pub total_outstanding: Decimal,
}

/// One row per loan status, zero-filled, in status order.
#[must_use]
pub fn loan_status_breakdown(rows: &[LoanStatusBreakdown]) -> Vec<LoanStatusBreakdown> {
    LoanStatus::ALL
        .iter()
        .map(|status| {
            rows.iter()
                .find(|r| r.status == *status)
                .cloned()
                .unwrap_or(LoanStatusBreakdown {
                    status: *status,
                    count: 0,
                    total_principal: Decimal::ZERO,
                    total_outstanding: Decimal::ZERO,
                })
        })
        .collect()
}
