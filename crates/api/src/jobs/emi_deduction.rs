//! Monthly EMI auto-deduction.
//!
//! Every due `active` or `overdue` loan is collected in its own database
//! transaction, so one failing loan never blocks the others. A loan whose
//! account cannot cover the EMI is marked overdue and retried on the next run.

use chrono::{DateTime, Utc};
use corebank_core::audit::{AuditAction, AuditEntry, AuditTarget, RequestMeta};
use corebank_core::loan::next_monthly_run;
use corebank_db::{AuditRepository, LoanRepository, repositories::RepoResult};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A loan the job could not collect.
#[derive(Debug, Clone, Serialize)]
pub struct EmiJobFailure {
    /// Loan ID.
    pub loan_id: Uuid,
    /// Loan number.
    pub loan_number: String,
    /// Why collection failed.
    pub error: String,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmiJobReport {
    /// Due loans found.
    pub processed: usize,
    /// EMIs collected.
    pub successful: usize,
    /// EMIs not collected.
    pub failed: usize,
    /// One entry per failed loan.
    pub errors: Vec<EmiJobFailure>,
}

/// The EMI deduction job.
#[derive(Debug, Clone)]
pub struct EmiDeductionJob {
    loans: LoanRepository,
    audit: AuditRepository,
}

impl EmiDeductionJob {
    /// Creates the job.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            loans: LoanRepository::new(db.clone()),
            audit: AuditRepository::new(db),
        }
    }

    /// Collects every EMI due today.
    ///
    /// # Errors
    ///
    /// Returns an error only if the due loans cannot be loaded; per-loan
    /// failures are reported in [`EmiJobReport::errors`].
    pub async fn run_once(&self) -> RepoResult<EmiJobReport> {
        self.run_at(Utc::now()).await
    }

    /// Collects every EMI due on `now`'s date.
    ///
    /// # Errors
    ///
    /// Same as [`Self::run_once`].
    pub async fn run_at(&self, now: DateTime<Utc>) -> RepoResult<EmiJobReport> {
        let today = now.date_naive();
        let due = self.loans.due_loans(today).await?;

        tracing::info!(count = due.len(), %today, "Starting EMI deduction run");

        let mut report = EmiJobReport {
            processed: due.len(),
            ..EmiJobReport::default()
        };

        for loan in due {
            match self.loans.deduct_emi(loan.id, None, true, today).await {
                Ok(payment) => {
                    report.successful += 1;
                    tracing::info!(
                        loan_number = %loan.loan_number,
                        amount = %payment.transaction.amount,
                        remaining_emis = payment.loan.remaining_emis,
                        "EMI deducted"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(loan_number = %loan.loan_number, error = %e, "EMI deduction failed");
                    report.errors.push(EmiJobFailure {
                        loan_id: loan.id,
                        loan_number: loan.loan_number,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            successful = report.successful,
            failed = report.failed,
            "EMI deduction run completed"
        );
        Ok(report)
    }

    /// Records a run in the audit log. `actor_id` is `None` for scheduled runs.
    pub async fn record(&self, actor_id: Option<Uuid>, report: &EmiJobReport, meta: RequestMeta) {
        let mut entry = AuditEntry::new(AuditAction::EmiJobRun, AuditTarget::System, None)
            .details(json!({
                "processed": report.processed,
                "successful": report.successful,
                "failed": report.failed,
            }))
            .meta(meta);
        if let Some(actor_id) = actor_id {
            entry = entry.actor(actor_id);
        }
        self.audit.record(entry).await;
    }

    /// Runs the job on the 1st of every month at `run_hour`:00 UTC until
    /// `shutdown` flips to `true`.
    pub fn spawn(self, run_hour: u32, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = match next_monthly_run(now, run_hour) {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::error!(error = %e, "Cannot schedule EMI deduction; scheduler stopped");
                        return;
                    }
                };
                let wait = (next - now).to_std().unwrap_or_default();
                tracing::info!(next_run = %next, "EMI deduction scheduled");

                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => {
                        tracing::info!("EMI scheduler stopped");
                        return;
                    }
                }

                match self.run_once().await {
                    Ok(report) => self.record(None, &report, RequestMeta::default()).await,
                    Err(e) => tracing::error!(error = %e, "EMI deduction run failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_fails_without_database() {
        let job = EmiDeductionJob::new(DatabaseConnection::default());
        assert!(job.run_once().await.is_err());
    }

    #[tokio::test]
    async fn test_spawned_scheduler_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = EmiDeductionJob::new(DatabaseConnection::default()).spawn(0, rx);

        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("scheduler exits")
            .expect("task does not panic");
    }

    #[test]
    fn test_report_serializes_counts() {
        let report = EmiJobReport {
            processed: 2,
            successful: 1,
            failed: 1,
            errors: vec![EmiJobFailure {
                loan_id: Uuid::nil(),
                loan_number: "LOAN0000000001001".into(),
                error: "Insufficient balance".into(),
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["failed"], 1);
        assert_eq!(value["errors"][0]["loan_number"], "LOAN0000000001001");
    }
}
