//! PostgreSQL Identity Store

use chrono::{DateTime, Utc};
use kernel::id::{PermissionId, RoleId, UserId};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{Permission, Role, User};
use crate::domain::repository::{RoleRepository, UserRepository};
use crate::domain::value_object::{email::Email, user_name::UserName};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed identity store
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations become `Conflict`; everything else stays a database error.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> AuthError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            tracing::debug!(constraint = ?db_err.constraint(), "Unique constraint violated");
            AuthError::Conflict(message.to_string())
        }
        _ => AuthError::Database(err),
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgIdentityStore {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                name,
                user_name,
                user_name_canonical,
                email,
                password_hash,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.name)
        .bind(user.user_name.original())
        .bind(user.user_name.canonical())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_phc_string())
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already exists"))?;

        for role in &user.roles {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user.user_id.as_uuid())
                .bind(role.role_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_user_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                user_id,
                name,
                user_name,
                email,
                password_hash,
                created_at
            FROM users
            WHERE user_name_canonical = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(user_name.canonical())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let roles = self.roles_for_user(&UserId::from_uuid(row.user_id)).await?;
        row.into_user(roles).map(Some)
    }
}

// ============================================================================
// Role Repository Implementation
// ============================================================================

impl RoleRepository for PgIdentityStore {
    async fn find_by_name(&self, name: &str) -> AuthResult<Option<Role>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                r.role_id,
                r.name AS role_name,
                p.permission_id,
                p.name AS permission_name
            FROM roles r
            LEFT JOIN role_permissions rp ON rp.role_id = r.role_id
            LEFT JOIN permissions p ON p.permission_id = rp.permission_id
            WHERE r.name = $1
            ORDER BY p.name
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_roles(rows).into_iter().next())
    }

    async fn roles_for_user(&self, user_id: &UserId) -> AuthResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT
                r.role_id,
                r.name AS role_name,
                p.permission_id,
                p.name AS permission_name
            FROM user_roles ur
            JOIN roles r ON r.role_id = ur.role_id
            LEFT JOIN role_permissions rp ON rp.role_id = r.role_id
            LEFT JOIN permissions p ON p.permission_id = rp.permission_id
            WHERE ur.user_id = $1
            ORDER BY r.name, p.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_roles(rows))
    }

    async fn create_permission(&self, permission: &Permission) -> AuthResult<()> {
        sqlx::query("INSERT INTO permissions (permission_id, name) VALUES ($1, $2)")
            .bind(permission.permission_id.as_uuid())
            .bind(&permission.name)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Permission already exists"))?;

        Ok(())
    }

    async fn create_role(&self, role: &Role) -> AuthResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO roles (role_id, name) VALUES ($1, $2)")
            .bind(role.role_id.as_uuid())
            .bind(&role.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "Role already exists"))?;

        for permission in &role.permissions {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
                .bind(role.role_id.as_uuid())
                .bind(permission.permission_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    name: String,
    user_name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, roles: Vec<Role>) -> AuthResult<User> {
        let password_hash = HashedPassword::from_phc_string(self.password_hash).map_err(|e| {
            AuthError::Internal(format!("Invalid password hash for {}: {}", self.user_id, e))
        })?;

        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            name: self.name,
            user_name: UserName::from_db(self.user_name),
            email: Email::from_db(self.email),
            password_hash,
            roles,
            created_at: self.created_at,
        })
    }
}

/// One row per (role, permission) pair; roles without permissions have NULLs.
#[derive(sqlx::FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    role_name: String,
    permission_id: Option<Uuid>,
    permission_name: Option<String>,
}

/// Group joined rows into roles, keeping row order.
fn fold_roles(rows: Vec<RolePermissionRow>) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();

    for row in rows {
        let index = match roles.iter().position(|r| *r.role_id.as_uuid() == row.role_id) {
            Some(index) => index,
            None => {
                roles.push(Role {
                    role_id: RoleId::from_uuid(row.role_id),
                    name: row.role_name,
                    permissions: Vec::new(),
                });
                roles.len() - 1
            }
        };

        if let (Some(permission_id), Some(name)) = (row.permission_id, row.permission_name) {
            roles[index].permissions.push(Permission {
                permission_id: PermissionId::from_uuid(permission_id),
                name,
            });
        }
    }

    roles
}
