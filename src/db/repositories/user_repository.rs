use crate::db::connection::DbPool;
use crate::db::models::User;
use sqlx::Error;
use uuid::Uuid;

pub async fn create_user(
    pool: &DbPool,
    email: &str,
    password_hash: &str,
) -> Result<User, Error> {
    let user_id = Uuid::new_v4();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, email, password_hash, created_at
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, Error> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_user_by_id(pool: &DbPool, user_id: Uuid) -> Result<Option<User>, Error> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
