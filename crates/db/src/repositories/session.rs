//! Refresh-token sessions.
//!
//! Only the SHA-256 hash of a refresh token is stored.

use chrono::{DateTime, Utc};
use corebank_shared::types::SessionId;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::error::RepoResult;
use crate::entities::sessions;

/// Session repository.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes a refresh token for storage.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Creates a session for a freshly issued refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> RepoResult<sessions::Model> {
        let now = Utc::now().into();

        let session = sessions::ActiveModel {
            id: Set(SessionId::new().into_inner()),
            user_id: Set(user_id),
            refresh_token_hash: Set(Self::hash_token(refresh_token)),
            user_agent: Set(user_agent.map(String::from)),
            ip_address: Set(ip_address.map(String::from)),
            expires_at: Set(expires_at.into()),
            revoked_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(session.insert(&self.db).await?)
    }

    /// Finds an unrevoked, unexpired session by refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token(&self, refresh_token: &str) -> RepoResult<Option<sessions::Model>> {
        Ok(sessions::Entity::find()
            .filter(sessions::Column::RefreshTokenHash.eq(Self::hash_token(refresh_token)))
            .filter(sessions::Column::RevokedAt.is_null())
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await?)
    }

    /// Finds a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<sessions::Model>> {
        Ok(sessions::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Revokes a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke(&self, id: Uuid) -> RepoResult<()> {
        let now = Utc::now();
        sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(now))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::Id.eq(id))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Revokes the session holding `refresh_token`. Returns false when no
    /// live session matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_by_token(&self, refresh_token: &str) -> RepoResult<bool> {
        match self.find_by_token(refresh_token).await? {
            Some(session) => {
                self.revoke(session.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Revokes every live session of a user (deactivation).
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_all_user_sessions(&self, user_id: Uuid) -> RepoResult<u64> {
        let now = Utc::now();
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(now))
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = %user_id, revoked = result.rows_affected, "Sessions revoked");
        }
        Ok(result.rows_affected)
    }

    /// Deletes expired sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self) -> RepoResult<u64> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = SessionRepository::hash_token("refresh-token");
        let b = SessionRepository::hash_token("refresh-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, SessionRepository::hash_token("other-token"));
    }
}
