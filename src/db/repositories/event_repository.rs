use crate::db::connection::{DbPool, is_unique_violation};
use crate::db::models::Event;
use rand::{Rng, distr::Alphanumeric};
use sqlx::Error;
use sqlx::types::Json;
use uuid::Uuid;

pub const SLUG_LEN: usize = 12;
const SLUG_RETRIES: usize = 3;

/// Random URL-safe sharing key. Uniqueness is enforced by the `slug`
/// column; collisions are retried by `create_event`.
pub fn generate_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LEN)
        .map(char::from)
        .collect()
}

pub async fn create_event(
    pool: &DbPool,
    creator: Uuid,
    name: &str,
    description: Option<&str>,
    date_options: &[String],
) -> Result<Event, Error> {
    let mut last_err = None;

    for _ in 0..SLUG_RETRIES {
        let event_id = Uuid::new_v4();
        let slug = generate_slug();

        let result = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, name, description, slug, date_options, creator)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, slug, date_options, creator, closed_at, created_at
            "#,
        )
        .bind(event_id)
        .bind(name)
        .bind(description)
        .bind(&slug)
        .bind(Json(date_options.to_vec()))
        .bind(creator)
        .fetch_one(pool)
        .await;

        match result {
            Ok(event) => return Ok(event),
            Err(e) if is_unique_violation(&e) => {
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or(Error::RowNotFound))
}

pub async fn find_event_by_slug(pool: &DbPool, slug: &str) -> Result<Option<Event>, Error> {
    let row = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, name, description, slug, date_options, creator, closed_at, created_at
        FROM events WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_event_by_id(pool: &DbPool, event_id: Uuid) -> Result<Option<Event>, Error> {
    let row = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, name, description, slug, date_options, creator, closed_at, created_at
        FROM events WHERE id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn list_events_by_creator(pool: &DbPool, creator: Uuid) -> Result<Vec<Event>, Error> {
    let rows = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, name, description, slug, date_options, creator, closed_at, created_at
        FROM events WHERE creator = $1 ORDER BY created_at DESC
        "#,
    )
    .bind(creator)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn close_event(pool: &DbPool, event_id: Uuid) -> Result<(), Error> {
    sqlx::query("UPDATE events SET closed_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn reopen_event(pool: &DbPool, event_id: Uuid) -> Result<(), Error> {
    sqlx::query("UPDATE events SET closed_at = NULL WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_url_safe_and_sized() {
        let slug = generate_slug();
        assert_eq!(slug.len(), SLUG_LEN);
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn slugs_are_not_repeated() {
        // Not a uniqueness proof, just a sanity check that the generator
        // is actually random.
        let a = generate_slug();
        let b = generate_slug();
        assert_ne!(a, b);
    }
}
