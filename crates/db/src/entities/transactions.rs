//! `SeaORM` Entity for transactions table.
//!
//! Rows are append-only. After insert only the reversal columns
//! (`status`, `reversed_by`, `reversed_at`, `reversal_reason`) are written.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use corebank_core::ledger::LedgerEntry;

use super::sea_orm_active_enums::{EntryDirection, TransactionStatus, TransactionType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference: String,
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub direction: EntryDirection,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub balance_after: Decimal,
    pub description: String,
    pub related_account_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
    pub counterpart_transaction_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub original_transaction_id: Option<Uuid>,
    pub status: TransactionStatus,
    pub reversed_by: Option<Uuid>,
    pub reversed_at: Option<DateTimeWithTimeZone>,
    pub reversal_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::loans::Entity",
        from = "Column::LoanId",
        to = "super::loans::Column::Id"
    )]
    Loans,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for LedgerEntry {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference.clone(),
            account_id: model.account_id,
            transaction_type: model.transaction_type.into(),
            direction: model.direction.into(),
            amount: model.amount,
            balance_after: model.balance_after,
            description: model.description.clone(),
            status: model.status.into(),
            created_at: model.created_at.to_utc(),
        }
    }
}
