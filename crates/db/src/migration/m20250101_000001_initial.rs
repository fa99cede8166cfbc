//! Initial database migration.
//!
//! Creates the enum types and the users, accounts, loans, transactions and
//! audit_logs tables. Money columns are `NUMERIC(19,2)` and balances may never
//! go below zero.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CUSTOMERS & ACCOUNTS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: LENDING
        // ============================================================
        db.execute_unprepared(LOANS_SQL).await?;

        // ============================================================
        // PART 4: LEDGER
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 5: AUDIT
        // ============================================================
        db.execute_unprepared(AUDIT_LOGS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('customer', 'admin');

CREATE TYPE account_type AS ENUM ('savings', 'student', 'fdr');
CREATE TYPE account_status AS ENUM ('active', 'frozen', 'closed');

CREATE TYPE transaction_type AS ENUM (
    'deposit',
    'withdrawal',
    'transfer_in',
    'transfer_out',
    'loan_disbursement',
    'emi_deduction',
    'reversal'
);
CREATE TYPE entry_direction AS ENUM ('credit', 'debit');
CREATE TYPE transaction_status AS ENUM ('completed', 'reversed');

CREATE TYPE loan_type AS ENUM ('personal', 'home', 'education', 'business', 'vehicle');
CREATE TYPE loan_status AS ENUM ('requested', 'active', 'overdue', 'paid', 'rejected');
CREATE TYPE employment_status AS ENUM ('employed', 'self_employed', 'business', 'student');

CREATE TYPE audit_action AS ENUM (
    'account_frozen',
    'account_unfrozen',
    'account_status_changed',
    'account_closed',
    'loan_approved',
    'loan_rejected',
    'transaction_reversed',
    'user_role_changed',
    'user_deactivated',
    'user_activated',
    'emi_job_run'
);
CREATE TYPE audit_target AS ENUM ('user', 'account', 'transaction', 'loan', 'system');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    full_name VARCHAR(100) NOT NULL,
    phone VARCHAR(20) NOT NULL,
    national_id VARCHAR(30) NOT NULL UNIQUE,
    address VARCHAR(300),
    role user_role NOT NULL DEFAULT 'customer',
    is_active BOOLEAN NOT NULL DEFAULT true,
    last_login_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_email_lowercase CHECK (email = lower(email))
);

CREATE INDEX idx_users_created ON users(created_at);
CREATE INDEX idx_users_role ON users(role);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    account_number VARCHAR(20) NOT NULL UNIQUE,
    user_id UUID NOT NULL REFERENCES users(id),
    account_type account_type NOT NULL,
    balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    status account_status NOT NULL DEFAULT 'active',
    currency VARCHAR(3) NOT NULL DEFAULT 'USD',
    interest_rate NUMERIC(5, 2),
    maturity_date DATE,
    opened_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_transaction_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_currency_format CHECK (currency ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_interest_rate CHECK (interest_rate IS NULL OR interest_rate BETWEEN 0 AND 30),
    CONSTRAINT chk_fdr_terms CHECK (
        account_type <> 'fdr' OR (interest_rate IS NOT NULL AND maturity_date IS NOT NULL)
    )
);

CREATE INDEX idx_accounts_user ON accounts(user_id);
CREATE INDEX idx_accounts_status ON accounts(status);
CREATE INDEX idx_accounts_opened ON accounts(opened_at);
";

const LOANS_SQL: &str = r"
CREATE TABLE loans (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    loan_number VARCHAR(20) NOT NULL UNIQUE,
    user_id UUID NOT NULL REFERENCES users(id),
    account_id UUID NOT NULL REFERENCES accounts(id),
    loan_type loan_type NOT NULL,
    principal NUMERIC(19, 2) NOT NULL,
    interest_rate NUMERIC(5, 2) NOT NULL,
    tenure_months INTEGER NOT NULL,
    emi_amount NUMERIC(19, 2) NOT NULL,
    total_payable NUMERIC(19, 2) NOT NULL,
    outstanding_balance NUMERIC(19, 2) NOT NULL,
    paid_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    remaining_emis INTEGER NOT NULL,
    status loan_status NOT NULL DEFAULT 'requested',
    purpose TEXT NOT NULL,
    employment_status employment_status NOT NULL,
    monthly_income NUMERIC(19, 2) NOT NULL,
    next_emi_date DATE,
    last_emi_at TIMESTAMPTZ,
    emi_start_date DATE,
    decided_by UUID REFERENCES users(id),
    decided_at TIMESTAMPTZ,
    rejection_reason TEXT,
    disbursed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_principal CHECK (principal >= 1000),
    CONSTRAINT chk_loan_interest_rate CHECK (interest_rate BETWEEN 0 AND 30),
    CONSTRAINT chk_tenure CHECK (tenure_months BETWEEN 6 AND 360),
    CONSTRAINT chk_outstanding CHECK (outstanding_balance >= 0),
    CONSTRAINT chk_paid CHECK (paid_amount >= 0),
    CONSTRAINT chk_remaining_emis CHECK (remaining_emis >= 0),
    CONSTRAINT chk_monthly_income CHECK (monthly_income >= 0)
);

CREATE INDEX idx_loans_user ON loans(user_id);
CREATE INDEX idx_loans_status ON loans(status);
CREATE INDEX idx_loans_due ON loans(next_emi_date) WHERE status IN ('active', 'overdue');
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    reference VARCHAR(32) NOT NULL UNIQUE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    user_id UUID NOT NULL REFERENCES users(id),
    transaction_type transaction_type NOT NULL,
    direction entry_direction NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    balance_after NUMERIC(19, 2) NOT NULL,
    description VARCHAR(300) NOT NULL,
    related_account_id UUID REFERENCES accounts(id),
    related_user_id UUID REFERENCES users(id),
    counterpart_transaction_id UUID,
    loan_id UUID REFERENCES loans(id),
    original_transaction_id UUID REFERENCES transactions(id),
    status transaction_status NOT NULL DEFAULT 'completed',
    reversed_by UUID REFERENCES users(id),
    reversed_at TIMESTAMPTZ,
    reversal_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_balance_after_non_negative CHECK (balance_after >= 0),
    CONSTRAINT chk_reversal_has_original CHECK (
        transaction_type <> 'reversal' OR original_transaction_id IS NOT NULL
    )
);

CREATE INDEX idx_txn_account_created ON transactions(account_id, created_at DESC);
CREATE INDEX idx_txn_user_created ON transactions(user_id, created_at DESC);
CREATE INDEX idx_txn_type_created ON transactions(transaction_type, created_at);
CREATE INDEX idx_txn_loan ON transactions(loan_id) WHERE loan_id IS NOT NULL;
";

const AUDIT_LOGS_SQL: &str = r"
CREATE TABLE audit_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    actor_id UUID REFERENCES users(id),
    action audit_action NOT NULL,
    target_type audit_target NOT NULL,
    target_id UUID,
    details JSONB NOT NULL DEFAULT '{}'::jsonb,
    reason TEXT,
    ip_address VARCHAR(45),
    user_agent TEXT,
    previous_state JSONB,
    new_state JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audit_created ON audit_logs(created_at DESC);
CREATE INDEX idx_audit_actor ON audit_logs(actor_id);
CREATE INDEX idx_audit_target ON audit_logs(target_type, target_id);
";

const TRIGGERS_SQL: &str = r"
-- The only permitted update marks a completed transaction as reversed.
CREATE OR REPLACE FUNCTION prevent_transaction_rewrite() RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status = 'reversed' THEN
        RAISE EXCEPTION 'reversed transactions are final';
    END IF;
    IF NEW.status IS DISTINCT FROM 'reversed'
        OR NEW.reversed_by IS NULL
        OR NEW.reversed_at IS NULL THEN
        RAISE EXCEPTION 'transactions are append-only';
    END IF;
    IF (NEW.id, NEW.reference, NEW.account_id, NEW.user_id, NEW.transaction_type,
        NEW.direction, NEW.amount, NEW.balance_after, NEW.description,
        NEW.related_account_id, NEW.related_user_id, NEW.counterpart_transaction_id,
        NEW.loan_id, NEW.original_transaction_id, NEW.created_at)
        IS DISTINCT FROM
       (OLD.id, OLD.reference, OLD.account_id, OLD.user_id, OLD.transaction_type,
        OLD.direction, OLD.amount, OLD.balance_after, OLD.description,
        OLD.related_account_id, OLD.related_user_id, OLD.counterpart_transaction_id,
        OLD.loan_id, OLD.original_transaction_id, OLD.created_at) THEN
        RAISE EXCEPTION 'transactions are append-only';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_immutable
    BEFORE UPDATE ON transactions
    FOR EACH ROW EXECUTE FUNCTION prevent_transaction_rewrite();

CREATE OR REPLACE FUNCTION prevent_transaction_delete() RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'transactions cannot be deleted';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_no_delete
    BEFORE DELETE ON transactions
    FOR EACH ROW EXECUTE FUNCTION prevent_transaction_delete();
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS audit_logs CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS loans CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP FUNCTION IF EXISTS prevent_transaction_rewrite();
DROP FUNCTION IF EXISTS prevent_transaction_delete();
DROP TYPE IF EXISTS audit_target;
DROP TYPE IF EXISTS audit_action;
DROP TYPE IF EXISTS employment_status;
DROP TYPE IF EXISTS loan_status;
DROP TYPE IF EXISTS loan_type;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS entry_direction;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS account_status;
DROP TYPE IF EXISTS account_type;
DROP TYPE IF EXISTS user_role;
";
