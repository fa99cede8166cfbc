//! Repositories over the `SeaORM` entities.
//!
//! Repositories load rows, apply the `corebank-core` rules and write the
//! result back, one database transaction per balance-changing operation.

pub mod account;
pub mod analytics;
pub mod audit;
pub mod error;
pub mod ledger;
pub mod loan;
mod posting;
pub mod session;
pub mod user;

pub use account::{AccountFilter, AccountRepository, OpenedAccount};
pub use analytics::AnalyticsRepository;
pub use audit::{AuditFilter, AuditRepository};
pub use error::{RepoResult, RepositoryError};
pub use ledger::{
    LedgerRepository, Posted, PostingRequest, Reversal, ReversedLeg, Statement, Transfer,
    TransactionFilter, TransferRequest,
};
pub use loan::{Disbursement, EmiPayment, LoanFilter, LoanRepository};
pub use session::SessionRepository;
pub use user::{NewUser, ProfileUpdate, UserFilter, UserRepository, UserWithAccounts};
