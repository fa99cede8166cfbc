//! Account domain types.

use chrono::NaiveDate;
use corebank_shared::types::Currency;
use rust_decimal::Decimal;
use serde::Deserialize;

text_enum! {
    /// Kind of deposit account.
    AccountType {
        /// Regular savings account.
        Savings => "savings",
        /// Student account.
        Student => "student",
        /// Fixed deposit (term deposit) with a rate and maturity date.
        Fdr => "fdr",
    }
}

text_enum! {
    /// Account lifecycle status.
    AccountStatus {
        /// Open for deposits, withdrawals and transfers.
        Active => "active",
        /// Blocked by an admin. Can be unfrozen.
        Frozen => "frozen",
        /// Terminal.
        Closed => "closed",
    }
}

/// Input for opening an account.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAccountInput {
    /// Account type.
    pub account_type: AccountType,
    /// Amount posted as a deposit when the account opens.
    #[serde(default)]
    pub initial_deposit: Decimal,
    /// Annual interest rate in percent (FDR only).
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    /// Maturity date (FDR only).
    #[serde(default)]
    pub maturity_date: Option<NaiveDate>,
    /// Account currency.
    #[serde(default)]
    pub currency: Currency,
}

impl OpenAccountInput {
    /// Savings account with no initial deposit.
    #[must_use]
    pub fn savings() -> Self {
        Self {
            account_type: AccountType::Savings,
            initial_deposit: Decimal::ZERO,
            interest_rate: None,
            maturity_date: None,
            currency: Currency::Usd,
        }
    }
}
