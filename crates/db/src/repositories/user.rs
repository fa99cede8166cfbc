//! User repository for database operations.

use std::collections::HashMap;

use chrono::Utc;
use corebank_core::auth::UserRole as DomainRole;
use corebank_shared::types::{PageRequest, PageResponse, UserId};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use super::error::{RepoResult, RepositoryError};
use crate::entities::{accounts, sea_orm_active_enums::UserRole, users};

/// Input for creating a user. The email must already be lowercased and the
/// password hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email (lowercase).
    pub email: String,
    /// Argon2id hash.
    pub password_hash: String,
    /// Full name.
    pub full_name: String,
    /// Phone number.
    pub phone: String,
    /// National ID or passport number.
    pub national_id: String,
    /// Postal address.
    pub address: Option<String>,
    /// Role.
    pub role: DomainRole,
}

/// Profile fields a user may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// Full name.
    pub full_name: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<String>,
}

/// Filter options for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match on name, email or phone.
    pub search: Option<String>,
    /// Filter by active flag.
    pub is_active: Option<bool>,
    /// Filter by role.
    pub role: Option<DomainRole>,
}

/// User with the number of accounts they own.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithAccounts {
    /// The user record.
    #[serde(flatten)]
    pub user: users::Model,
    /// Number of accounts owned.
    pub account_count: i64,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> RepoResult<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?)
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<users::Model>> {
        Ok(users::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Loads a user or fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn get(&self, id: Uuid) -> RepoResult<users::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User", id))
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Checks if a national ID / passport number is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn national_id_exists(&self, national_id: &str) -> RepoResult<bool> {
        let count = users::Entity::find()
            .filter(users::Column::NationalId.eq(national_id.trim()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the email or national ID is taken.
    pub async fn create(&self, input: NewUser) -> RepoResult<users::Model> {
        let now = Utc::now().into();
        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            email: Set(input.email.trim().to_lowercase()),
            password_hash: Set(input.password_hash),
            full_name: Set(input.full_name.trim().to_string()),
            phone: Set(input.phone.trim().to_string()),
            national_id: Set(input.national_id.trim().to_string()),
            address: Set(input.address),
            role: Set(input.role.into()),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = user.insert(&self.db).await?;
        tracing::info!(user_id = %user.id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Updates profile fields.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<users::Model> {
        let user = self.get(id).await?;
        let mut active: users::ActiveModel = user.into();

        if let Some(full_name) = update.full_name {
            active.full_name = Set(full_name.trim().to_string());
        }
        if let Some(phone) = update.phone {
            active.phone = Set(phone.trim().to_string());
        }
        if let Some(address) = update.address {
            let address = address.trim().to_string();
            active.address = Set((!address.is_empty()).then_some(address));
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Activates or deactivates a user. Returns the previous and updated rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> RepoResult<(users::Model, users::Model)> {
        let before = self.get(id).await?;
        let mut active: users::ActiveModel = before.clone().into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());
        let after = active.update(&self.db).await?;

        tracing::info!(user_id = %id, is_active, "User status changed");
        Ok((before, after))
    }

    /// Changes a user's role. Returns the previous and updated rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    pub async fn set_role(
        &self,
        id: Uuid,
        role: DomainRole,
    ) -> RepoResult<(users::Model, users::Model)> {
        let before = self.get(id).await?;
        let mut active: users::ActiveModel = before.clone().into();
        active.role = Set(role.into());
        active.updated_at = Set(Utc::now().into());
        let after = active.update(&self.db).await?;

        tracing::info!(user_id = %id, role = %role, "User role changed");
        Ok((before, after))
    }

    /// Records a successful login.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn touch_last_login(&self, id: Uuid) -> RepoResult<()> {
        let now = Utc::now();
        users::Entity::update_many()
            .col_expr(users::Column::LastLoginAt, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Lists users, newest first, with their account counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: &PageRequest,
    ) -> RepoResult<PageResponse<UserWithAccounts>> {
        let mut query = users::Entity::find();

        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(users::Column::FullName))).like(&pattern))
                    .add(users::Column::Email.like(&pattern))
                    .add(users::Column::Phone.contains(search)),
            );
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(users::Column::IsActive.eq(is_active));
        }
        if let Some(role) = filter.role {
            query = query.filter(users::Column::Role.eq(UserRole::from(role)));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(users::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|u| u.id).collect();
        let counts: HashMap<Uuid, i64> = if ids.is_empty() {
            HashMap::new()
        } else {
            accounts::Entity::find()
                .select_only()
                .column(accounts::Column::UserId)
                .column_as(Expr::col(accounts::Column::Id).count(), "account_count")
                .filter(accounts::Column::UserId.is_in(ids))
                .group_by(accounts::Column::UserId)
                .into_tuple::<(Uuid, i64)>()
                .all(&self.db)
                .await?
                .into_iter()
                .collect()
        };

        let data = rows
            .into_iter()
            .map(|user| {
                let account_count = counts.get(&user.id).copied().unwrap_or(0);
                UserWithAccounts {
                    user,
                    account_count,
                }
            })
            .collect();

        Ok(PageResponse::new(data, page, total))
    }
}
