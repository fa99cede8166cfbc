//! `SeaORM` entity prelude.

pub use super::accounts::Entity as Accounts;
pub use super::audit_logs::Entity as AuditLogs;
pub use super::loans::Entity as Loans;
pub use super::sessions::Entity as Sessions;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
