use anyhow::Result;
use sqlx::SqlitePool;
use stadium_models::{Page, Role, User, UserCredentials, Window};

const USER_COLUMNS: &str = "id, username, email, role, created_at";

pub async fn list_users(pool: &SqlitePool, window: Window) -> Result<Page<User>> {
    let total = super::count(pool, "users").await?;
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ? OFFSET ?");
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(window.sql_limit())
        .bind(window.sql_offset())
        .fetch_all(pool)
        .await?;
    Ok(Page::new(users, window, total))
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_credentials(pool: &SqlitePool, username: &str) -> Result<Option<UserCredentials>> {
    let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?");
    let creds = sqlx::query_as::<_, UserCredentials>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(creds)
}

/// Fails with a unique violation (see [`crate::is_unique_violation`]) when
/// the username is taken.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<User> {
    let sql = format!(
        "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?) \
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

/// `password_hash: None` keeps the stored hash.
pub async fn update_user(
    pool: &SqlitePool,
    id: i64,
    username: &str,
    email: &str,
    role: Role,
    password_hash: Option<&str>,
) -> Result<Option<User>> {
    let sql = format!(
        "UPDATE users SET username = ?, email = ?, role = ?, \
            password_hash = COALESCE(?, password_hash) \
         WHERE id = ? RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .bind(email)
        .bind(role)
        .bind(password_hash)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
