use crate::db::connection::DbPool;
use crate::db::models::EventParticipation;
use sqlx::Error;
use sqlx::types::Json;
use uuid::Uuid;

pub async fn create_participation(
    pool: &DbPool,
    event: Uuid,
    participant_name: &str,
    selected_dates: &[String],
    comment: Option<&str>,
) -> Result<EventParticipation, Error> {
    let participation_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, EventParticipation>(
        r#"
        INSERT INTO event_participations (id, event, participant_name, selected_dates, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, event, participant_name, selected_dates, comment, created_at
        "#,
    )
    .bind(participation_id)
    .bind(event)
    .bind(participant_name)
    .bind(Json(selected_dates.to_vec()))
    .bind(comment)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// All responses for an event in insertion order, the order the matrix
/// shows its rows in.
pub async fn list_participations_for_event(
    pool: &DbPool,
    event: Uuid,
) -> Result<Vec<EventParticipation>, Error> {
    let rows = sqlx::query_as::<_, EventParticipation>(
        r#"
        SELECT id, event, participant_name, selected_dates, comment, created_at
        FROM event_participations WHERE event = $1 ORDER BY created_at ASC
        "#,
    )
    .bind(event)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The "current" response for a name: the oldest row matching the exact
/// name. Multiple rows per (event, name) can exist at the storage layer;
/// insertion order breaks the tie.
pub async fn find_participation_by_name(
    pool: &DbPool,
    event: Uuid,
    participant_name: &str,
) -> Result<Option<EventParticipation>, Error> {
    let row = sqlx::query_as::<_, EventParticipation>(
        r#"
        SELECT id, event, participant_name, selected_dates, comment, created_at
        FROM event_participations
        WHERE event = $1 AND participant_name = $2
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(event)
    .bind(participant_name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_participation_by_id(
    pool: &DbPool,
    event: Uuid,
    participation_id: Uuid,
) -> Result<Option<EventParticipation>, Error> {
    let row = sqlx::query_as::<_, EventParticipation>(
        r#"
        SELECT id, event, participant_name, selected_dates, comment, created_at
        FROM event_participations WHERE id = $1 AND event = $2
        "#,
    )
    .bind(participation_id)
    .bind(event)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Revises the dates and comment of an existing response. The name is
/// deliberately not updatable; the edit flow only ever revises the row the
/// resolver matched for that exact name.
pub async fn update_participation(
    pool: &DbPool,
    event: Uuid,
    participation_id: Uuid,
    selected_dates: &[String],
    comment: Option<&str>,
) -> Result<Option<EventParticipation>, Error> {
    let row = sqlx::query_as::<_, EventParticipation>(
        r#"
        UPDATE event_participations
        SET selected_dates = $3, comment = $4
        WHERE id = $1 AND event = $2
        RETURNING id, event, participant_name, selected_dates, comment, created_at
        "#,
    )
    .bind(participation_id)
    .bind(event)
    .bind(Json(selected_dates.to_vec()))
    .bind(comment)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
