//! Database seeder for Corebank development and testing.
//!
//! Seeds an admin, a demo customer with savings and current accounts, a few
//! postings and an approved personal loan. Running it twice is a no-op.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use corebank_core::account::{AccountType, OpenAccountInput};
use corebank_core::audit::RequestMeta;
use corebank_core::auth::{Actor, UserRole, hash_password};
use corebank_core::loan::{EmploymentStatus, LoanApplication, LoanType};
use corebank_db::{
    AccountRepository, LedgerRepository, LoanRepository, UserRepository,
    entities::users,
    repositories::{NewUser, PostingRequest, TransferRequest},
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

const ADMIN_EMAIL: &str = "admin@corebank.dev";
const ADMIN_PASSWORD: &str = "Admin@12345";
const CUSTOMER_EMAIL: &str = "jane.doe@corebank.dev";
const CUSTOMER_PASSWORD: &str = "Customer@123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = corebank_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding admin...");
    let Some(admin) = seed_user(
        &db,
        NewUser {
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(ADMIN_PASSWORD)?,
            full_name: "System Administrator".to_string(),
            phone: "+10000000001".to_string(),
            national_id: "ADMIN-0001".to_string(),
            address: None,
            role: UserRole::Admin,
        },
    )
    .await?
    else {
        println!("Seed data already present, nothing to do.");
        return Ok(());
    };

    println!("Seeding demo customer...");
    let Some(customer) = seed_user(
        &db,
        NewUser {
            email: CUSTOMER_EMAIL.to_string(),
            password_hash: hash_password(CUSTOMER_PASSWORD)?,
            full_name: "Jane Doe".to_string(),
            phone: "+10000000002".to_string(),
            national_id: "CUST-0001".to_string(),
            address: Some("42 Main Street, Springfield".to_string()),
            role: UserRole::Customer,
        },
    )
    .await?
    else {
        println!("  Demo customer already exists, skipping accounts and loans...");
        return Ok(());
    };

    let admin = Actor::new(admin.id, UserRole::Admin);
    let customer = Actor::new(customer.id, UserRole::Customer);
    seed_banking(&db, &admin, &customer).await?;

    println!("Seeding complete!");
    println!("  Admin:    {ADMIN_EMAIL} / {ADMIN_PASSWORD}");
    println!("  Customer: {CUSTOMER_EMAIL} / {CUSTOMER_PASSWORD}");
    Ok(())
}

/// Creates a user unless the email is taken. Returns `None` when skipped.
async fn seed_user(db: &DatabaseConnection, user: NewUser) -> anyhow::Result<Option<users::Model>> {
    let repo = UserRepository::new(db.clone());
    if repo.email_exists(&user.email).await? {
        println!("  {} already exists, skipping...", user.email);
        return Ok(None);
    }

    let created = repo.create(user).await?;
    println!("  Created {} ({})", created.email, created.full_name);
    Ok(Some(created))
}

async fn seed_banking(
    db: &DatabaseConnection,
    admin: &Actor,
    customer: &Actor,
) -> anyhow::Result<()> {
    let accounts = AccountRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());
    let loans = LoanRepository::new(db.clone());

    let savings = accounts
        .open(
            customer.user_id,
            OpenAccountInput {
                initial_deposit: Decimal::new(5_000_00, 2),
                interest_rate: Some(Decimal::new(350, 2)),
                ..OpenAccountInput::savings()
            },
        )
        .await?
        .account;
    println!("  Opened savings account {}", savings.account_number);

    let current = accounts
        .open(
            customer.user_id,
            OpenAccountInput {
                account_type: AccountType::Current,
                initial_deposit: Decimal::new(1_000_00, 2),
                ..OpenAccountInput::savings()
            },
        )
        .await?
        .account;
    println!("  Opened current account {}", current.account_number);

    ledger
        .deposit(
            customer,
            PostingRequest {
                account_id: savings.id,
                amount: Decimal::new(2_500_00, 2),
                description: Some("Salary".to_string()),
            },
        )
        .await?;
    ledger
        .withdraw(
            customer,
            PostingRequest {
                account_id: current.id,
                amount: Decimal::new(120_50, 2),
                description: Some("ATM withdrawal".to_string()),
            },
        )
        .await?;
    ledger
        .transfer(
            customer,
            TransferRequest {
                from_account_id: savings.id,
                to_account_id: current.id,
                amount: Decimal::new(750_00, 2),
                description: Some("Monthly budget".to_string()),
            },
        )
        .await?;
    println!("  Posted deposit, withdrawal and transfer");

    let loan = loans
        .apply(
            customer,
            LoanApplication {
                account_id: savings.id,
                loan_type: LoanType::Personal,
                principal: Decimal::new(10_000, 0),
                interest_rate: Decimal::new(12, 0),
                tenure_months: 12,
                purpose: "Home renovation and furniture".to_string(),
                employment_status: EmploymentStatus::Employed,
                monthly_income: Decimal::new(4_500, 0),
            },
        )
        .await?;
    let disbursement = loans.approve(admin, loan.id, RequestMeta::default()).await?;
    println!(
        "  Approved loan {} (EMI {})",
        disbursement.loan.loan_number, disbursement.loan.emi_amount
    );

    Ok(())
}
