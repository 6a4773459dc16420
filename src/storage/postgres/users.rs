use tokio_postgres::types::Json;

use super::decode;
use crate::models::{ProfileUpdate, Role, User};
use crate::storage::pg::PgPool;
use crate::storage::Result;

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let client = pool.get().await?;
    let rows = client
        .query("SELECT doc FROM users ORDER BY seq", &[])
        .await?;

    rows.iter().map(decode).collect()
}

pub async fn find_user(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT doc FROM users WHERE email = $1", &[&email])
        .await?;

    row.as_ref().map(decode).transpose()
}

pub async fn insert_user_if_absent(pool: &PgPool, user: &User) -> Result<bool> {
    let client = pool.get().await?;
    let inserted = client
        .execute(
            "INSERT INTO users (id, email, doc) VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
            &[&user.id, &user.email, &Json(user)],
        )
        .await?;

    Ok(inserted > 0)
}

pub async fn update_profile(pool: &PgPool, email: &str, update: &ProfileUpdate) -> Result<u64> {
    let client = pool.get().await?;
    let modified = client
        .execute(
            "UPDATE users SET doc = doc || $2 WHERE email = $1",
            &[&email, &Json(update)],
        )
        .await?;

    Ok(modified)
}

pub async fn set_role(pool: &PgPool, id: &str, role: Role) -> Result<u64> {
    let client = pool.get().await?;
    let modified = client
        .execute(
            "UPDATE users SET doc = jsonb_set(doc, '{role}', $2) WHERE id = $1",
            &[&id, &Json(role)],
        )
        .await?;

    Ok(modified)
}

pub async fn delete_user(pool: &PgPool, id: &str) -> Result<u64> {
    let client = pool.get().await?;
    let deleted = client
        .execute("DELETE FROM users WHERE id = $1", &[&id])
        .await?;

    Ok(deleted)
}
