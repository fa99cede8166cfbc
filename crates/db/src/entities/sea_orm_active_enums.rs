//! `SeaORM` active enums mirroring the PostgreSQL enum types.
//!
//! Each enum converts to and from its `corebank-core` counterpart so
//! repositories can hand rows to the domain rules.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use corebank_core::{account, audit, auth, ledger, loan};

/// Generates `From` conversions in both directions between a database enum
/// and the domain enum with the same variants.
macro_rules! mirror_enum {
    ($db:ident <=> $module:ident :: $domain:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$db> for $module::$domain {
            fn from(value: $db) -> Self {
                match value {
                    $( $db::$variant => Self::$variant ),+
                }
            }
        }

        impl From<$module::$domain> for $db {
            fn from(value: $module::$domain) -> Self {
                match value {
                    $( $module::$domain::$variant => Self::$variant ),+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[sea_orm(string_value = "savings")]
    Savings,
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "fdr")]
    Fdr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_status")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "frozen")]
    Frozen,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "loan_disbursement")]
    LoanDisbursement,
    #[sea_orm(string_value = "emi_deduction")]
    EmiDeduction,
    #[sea_orm(string_value = "reversal")]
    Reversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_direction")]
#[serde(rename_all = "snake_case")]
pub enum EntryDirection {
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "debit")]
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "loan_type")]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    #[sea_orm(string_value = "personal")]
    Personal,
    #[sea_orm(string_value = "home")]
    Home,
    #[sea_orm(string_value = "education")]
    Education,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "vehicle")]
    Vehicle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "loan_status")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[sea_orm(string_value = "requested")]
    Requested,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "overdue")]
    Overdue,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "employment_status")]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[sea_orm(string_value = "employed")]
    Employed,
    #[sea_orm(string_value = "self_employed")]
    SelfEmployed,
    #[sea_orm(string_value = "business")]
    Business,
    #[sea_orm(string_value = "student")]
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "audit_action")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    #[sea_orm(string_value = "account_frozen")]
    AccountFrozen,
    #[sea_orm(string_value = "account_unfrozen")]
    AccountUnfrozen,
    #[sea_orm(string_value = "account_status_changed")]
    AccountStatusChanged,
    #[sea_orm(string_value = "account_closed")]
    AccountClosed,
    #[sea_orm(string_value = "loan_approved")]
    LoanApproved,
    #[sea_orm(string_value = "loan_rejected")]
    LoanRejected,
    #[sea_orm(string_value = "transaction_reversed")]
    TransactionReversed,
    #[sea_orm(string_value = "user_role_changed")]
    UserRoleChanged,
    #[sea_orm(string_value = "user_deactivated")]
    UserDeactivated,
    #[sea_orm(string_value = "user_activated")]
    UserActivated,
    #[sea_orm(string_value = "emi_job_run")]
    EmiJobRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "audit_target")]
#[serde(rename_all = "snake_case")]
pub enum AuditTarget {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "account")]
    Account,
    #[sea_orm(string_value = "transaction")]
    Transaction,
    #[sea_orm(string_value = "loan")]
    Loan,
    #[sea_orm(string_value = "system")]
    System,
}

mirror_enum!(UserRole <=> auth::UserRole { Customer, Admin });
mirror_enum!(AccountType <=> account::AccountType { Savings, Student, Fdr });
mirror_enum!(AccountStatus <=> account::AccountStatus { Active, Frozen, Closed });
mirror_enum!(TransactionType <=> ledger::TransactionType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    LoanDisbursement,
    EmiDeduction,
    Reversal,
});
mirror_enum!(EntryDirection <=> ledger::Direction { Credit, Debit });
mirror_enum!(TransactionStatus <=> ledger::TransactionStatus { Completed, Reversed });
mirror_enum!(LoanType <=> loan::LoanType { Personal, Home, Education, Business, Vehicle });
mirror_enum!(LoanStatus <=> loan::LoanStatus { Requested, Active, Overdue, Paid, Rejected });
mirror_enum!(EmploymentStatus <=> loan::EmploymentStatus {
    Employed,
    SelfEmployed,
    Business,
    Student,
});
mirror_enum!(AuditAction <=> audit::AuditAction {
    AccountFrozen,
    AccountUnfrozen,
    AccountStatusChanged,
    AccountClosed,
    LoanApproved,
    LoanRejected,
    TransactionReversed,
    UserRoleChanged,
    UserDeactivated,
    UserActivated,
    EmiJobRun,
});
mirror_enum!(AuditTarget <=> audit::AuditTarget { User, Account, Transaction, Loan, System });

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveEnum, Iterable};

    use super::*;

    #[test]
    fn test_string_values_match_domain() {
        for value in TransactionType::iter() {
            let domain: ledger::TransactionType = value.into();
            assert_eq!(value.to_value(), domain.as_str());
            assert_eq!(TransactionType::from(domain), value);
        }
        for value in AuditAction::iter() {
            let domain: audit::AuditAction = value.into();
            assert_eq!(value.to_value(), domain.as_str());
        }
        for value in LoanStatus::iter() {
            let domain: loan::LoanStatus = value.into();
            assert_eq!(value.to_value(), domain.as_str());
        }
    }
}
