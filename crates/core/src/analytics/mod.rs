//! Aggregation shapes for admin analytics.
//!
//! The database computes grouped totals; this module turns them into
//! zero-filled, chart-ready series.

pub mod types;

pub use types::{
    AccountGrowth, AccountStats, AnalyticsOverview, AnalyticsPeriod, LoanStats,
    LoanStatusBreakdown, MonthKey, MonthlyTrend, TransactionStats, TypeTotal, UserStats,
    account_growth, last_twelve_months, loan_status_breakdown, monthly_trends,
};
