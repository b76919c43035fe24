//! Users of one tenant database (`users`, `role`, `user_role`).

use serde::Serialize;
use sqlx::PgPool;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
}

type UserRow = (i64, String, String, bool);

impl From<UserRow> for User {
    fn from((id, username, password_hash, active): UserRow) -> Self {
        Self {
            id,
            username,
            password_hash,
            active,
        }
    }
}

/// Queries take the tenant pool explicitly; callers get it from the router.
pub struct UserService;

impl UserService {
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password, active FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(User::from))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT id, username, password, active FROM users ORDER BY id")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn roles_for(pool: &PgPool, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.name FROM role r
            JOIN user_role ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}
