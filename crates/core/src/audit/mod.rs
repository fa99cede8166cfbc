//! Audit trail entries for privileged actions.
//!
//! Entries are built here and persisted best-effort by the `db` crate: a
//! failed audit write is logged and never undoes the action it describes.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

text_enum! {
    /// Privileged action being recorded.
    AuditAction {
        /// Account frozen by an admin.
        AccountFrozen => "account_frozen",
        /// Account unfrozen by an admin.
        AccountUnfrozen => "account_unfrozen",
        /// Account status set explicitly.
        AccountStatusChanged => "account_status_changed",
        /// Account closed.
        AccountClosed => "account_closed",
        /// Loan approved and disbursed.
        LoanApproved => "loan_approved",
        /// Loan rejected.
        LoanRejected => "loan_rejected",
        /// Transaction reversed.
        TransactionReversed => "transaction_reversed",
        /// User role changed.
        UserRoleChanged => "user_role_changed",
        /// User deactivated.
        UserDeactivated => "user_deactivated",
        /// User reactivated.
        UserActivated => "user_activated",
        /// EMI deduction job executed.
        EmiJobRun => "emi_job_run",
    }
}

text_enum! {
    /// Kind of entity an audit entry refers to.
    AuditTarget {
        /// A user.
        User => "user",
        /// An account.
        Account => "account",
        /// A transaction.
        Transaction => "transaction",
        /// A loan.
        Loan => "loan",
        /// The system itself (jobs).
        System => "system",
    }
}

/// Client metadata captured with an audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestMeta {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// An audit entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// Acting user. `None` for scheduled jobs.
    pub actor_id: Option<Uuid>,
    /// Action.
    pub action: AuditAction,
    /// Target kind.
    pub target_type: AuditTarget,
    /// Target ID.
    pub target_id: Option<Uuid>,
    /// Free-form details.
    pub details: Value,
    /// Reason given by the actor.
    pub reason: Option<String>,
    /// State before the action.
    pub previous_state: Option<Value>,
    /// State after the action.
    pub new_state: Option<Value>,
    /// Client metadata.
    pub meta: RequestMeta,
}

impl AuditEntry {
    /// Starts an entry for `action` on `target_type`/`target_id`.
    #[must_use]
    pub fn new(action: AuditAction, target_type: AuditTarget, target_id: Option<Uuid>) -> Self {
        Self {
            actor_id: None,
            action,
            target_type,
            target_id,
            details: Value::Object(serde_json::Map::new()),
            reason: None,
            previous_state: None,
            new_state: None,
            meta: RequestMeta::default(),
        }
    }

    /// Sets the acting user.
    #[must_use]
    pub fn actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Sets free-form details.
    #[must_use]
    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Sets the reason, ignoring blank strings.
    #[must_use]
    pub fn reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);
        self
    }

    /// Records the state transition.
    #[must_use]
    pub fn states(mut self, previous: Value, new: Value) -> Self {
        self.previous_state = Some(previous);
        self.new_state = Some(new);
        self
    }

    /// Attaches client metadata.
    #[must_use]
    pub fn meta(mut self, meta: RequestMeta) -> Self {
        self.meta = meta;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builder() {
        let admin = Uuid::new_v4();
        let account = Uuid::new_v4();
        let entry = AuditEntry::new(AuditAction::AccountFrozen, AuditTarget::Account, Some(account))
            .actor(admin)
            .reason(Some("  suspicious activity "))
            .states(json!({"status": "active"}), json!({"status": "frozen"}))
            .meta(RequestMeta {
                ip_address: Some("10.0.0.1".into()),
                user_agent: None,
            });

        assert_eq!(entry.actor_id, Some(admin));
        assert_eq!(entry.reason.as_deref(), Some("suspicious activity"));
        assert_eq!(entry.new_state, Some(json!({"status": "frozen"})));
        assert_eq!(entry.meta.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_blank_reason_dropped() {
        let entry = AuditEntry::new(AuditAction::EmiJobRun, AuditTarget::System, None).reason(Some("   "));
        assert!(entry.reason.is_none());
        assert!(entry.actor_id.is_none());
    }

    #[test]
    fn test_action_strings() {
        assert_eq!(AuditAction::TransactionReversed.as_str(), "transaction_reversed");
        assert_eq!(AuditTarget::System.to_string(), "system");
    }
}
