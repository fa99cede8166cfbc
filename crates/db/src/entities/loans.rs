//! `SeaORM` Entity for loans table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use corebank_core::loan::LoanProgress;

use super::sea_orm_active_enums::{EmploymentStatus, LoanStatus, LoanType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub loan_number: String,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub loan_type: LoanType,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub principal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub interest_rate: Decimal,
    pub tenure_months: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub emi_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_payable: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub outstanding_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub paid_amount: Decimal,
    pub remaining_emis: i32,
    pub status: LoanStatus,
    pub purpose: String,
    pub employment_status: EmploymentStatus,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub monthly_income: Decimal,
    pub next_emi_date: Option<Date>,
    pub last_emi_at: Option<DateTimeWithTimeZone>,
    pub emi_start_date: Option<Date>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub disbursed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Repayment counters in domain form.
    #[must_use]
    pub fn progress(&self) -> LoanProgress {
        LoanProgress {
            emi: self.emi_amount,
            outstanding: self.outstanding_balance,
            paid: self.paid_amount,
            remaining_emis: u32::try_from(self.remaining_emis).unwrap_or_default(),
            status: self.status.into(),
            next_emi_date: self.next_emi_date,
        }
    }
}
