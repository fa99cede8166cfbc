//! Audit log repository.
//!
//! Writes are best-effort: they happen after the audited action has committed,
//! and a failed insert is logged instead of returned.

use chrono::{DateTime, Utc};
use corebank_core::audit::{AuditAction as DomainAction, AuditEntry, AuditTarget as DomainTarget};
use corebank_shared::types::{AuditLogId, PageRequest, PageResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::{
    audit_logs,
    sea_orm_active_enums::{AuditAction, AuditTarget},
};

/// Filter options for listing audit logs.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Acting user.
    pub actor_id: Option<Uuid>,
    /// Action.
    pub action: Option<DomainAction>,
    /// Target kind.
    pub target_type: Option<DomainTarget>,
    /// Target ID.
    pub target_id: Option<Uuid>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created before.
    pub to: Option<DateTime<Utc>>,
}

/// Audit log repository.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persists an audit entry. Failures are logged, never returned.
    pub async fn record(&self, entry: AuditEntry) {
        let action = entry.action;
        let target_id = entry.target_id;
        let model = audit_logs::ActiveModel {
            id: Set(AuditLogId::new().into_inner()),
            actor_id: Set(entry.actor_id),
            action: Set(entry.action.into()),
            target_type: Set(entry.target_type.into()),
            target_id: Set(entry.target_id),
            details: Set(entry.details),
            reason: Set(entry.reason),
            ip_address: Set(entry.meta.ip_address),
            user_agent: Set(entry.meta.user_agent),
            previous_state: Set(entry.previous_state),
            new_state: Set(entry.new_state),
            created_at: Set(Utc::now().into()),
        };

        match model.insert(&self.db).await {
            Ok(_) => tracing::debug!(%action, ?target_id, "Audit entry recorded"),
            Err(e) => tracing::error!(%action, ?target_id, error = %e, "Failed to record audit entry"),
        }
    }

    /// Lists audit logs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> RepoResult<PageResponse<audit_logs::Model>> {
        let mut query = audit_logs::Entity::find();

        if let Some(actor_id) = filter.actor_id {
            query = query.filter(audit_logs::Column::ActorId.eq(actor_id));
        }
        if let Some(action) = filter.action {
            query = query.filter(audit_logs::Column::Action.eq(AuditAction::from(action)));
        }
        if let Some(target_type) = filter.target_type {
            query = query.filter(audit_logs::Column::TargetType.eq(AuditTarget::from(target_type)));
        }
        if let Some(target_id) = filter.target_id {
            query = query.filter(audit_logs::Column::TargetId.eq(target_id));
        }
        if let Some(from) = filter.from {
            query = query.filter(audit_logs::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(audit_logs::Column::CreatedAt.lt(to));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(audit_logs::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }
}
