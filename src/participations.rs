use crate::db::models::Event;
use crate::db::repositories::{event_repository, participation_repository};
use crate::error::EventError;
use crate::resolver::MIN_NAME_CHARS;
use crate::sse::broadcaster::EventUpdate;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

pub const MAX_PARTICIPANT_NAME_LEN: usize = 100;
pub const MAX_COMMENT_LEN: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub participant_name: String,
    pub selected_dates: Vec<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub name: String,
}

/// All checks run before anything is written, so a rejected submission
/// leaves the caller's unsaved input untouched.
pub(crate) fn validate_vote(event: &Event, payload: &VoteRequest) -> Result<(), String> {
    let name = payload.participant_name.trim();
    if name.is_empty() {
        return Err("Please enter your name".to_string());
    }
    if name.chars().count() > MAX_PARTICIPANT_NAME_LEN {
        return Err(format!(
            "Name must be at most {MAX_PARTICIPANT_NAME_LEN} characters"
        ));
    }
    if payload.selected_dates.is_empty() {
        return Err("Please select at least one date".to_string());
    }
    for date in &payload.selected_dates {
        if !event.date_options.0.iter().any(|d| d == date) {
            return Err(format!("'{date}' is not one of this event's date options"));
        }
    }
    if let Some(comment) = &payload.comment {
        if comment.chars().count() > MAX_COMMENT_LEN {
            return Err(format!("Comment must be at most {MAX_COMMENT_LEN} characters"));
        }
    }

    Ok(())
}

async fn open_event_by_slug(app_state: &AppState, slug: &str) -> Result<Event, EventError> {
    let event = event_repository::find_event_by_slug(&app_state.db, slug)
        .await?
        .ok_or(EventError::EventNotFound)?;

    if event.is_closed() {
        return Err(EventError::EventClosed);
    }

    Ok(event)
}

/// Submit a new response (anonymous; no authentication required)
pub async fn submit_vote(
    Extension(app_state): Extension<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<impl IntoResponse, EventError> {
    let event = open_event_by_slug(&app_state, &slug).await?;

    validate_vote(&event, &payload).map_err(EventError::InvalidRequest)?;

    let participation = participation_repository::create_participation(
        &app_state.db,
        event.id,
        payload.participant_name.trim(),
        &payload.selected_dates,
        payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()),
    )
    .await?;

    info!(
        "Response {} recorded for event {}",
        participation.id, event.id
    );

    let _ = app_state
        .updates
        .send(EventUpdate::VoteSubmitted { event_id: event.id });

    Ok((StatusCode::CREATED, Json(participation)))
}

/// Revise an existing response found by the resolver. The payload name
/// must match the stored row; the edit flow never renames a response or
/// touches one belonging to another name.
pub async fn revise_vote(
    Extension(app_state): Extension<AppState>,
    Path((slug, participation_id)): Path<(String, Uuid)>,
    Json(payload): Json<VoteRequest>,
) -> Result<impl IntoResponse, EventError> {
    let event = open_event_by_slug(&app_state, &slug).await?;

    validate_vote(&event, &payload).map_err(EventError::InvalidRequest)?;

    let existing =
        participation_repository::find_participation_by_id(&app_state.db, event.id, participation_id)
            .await?
            .ok_or(EventError::ParticipationNotFound)?;

    if existing.participant_name != payload.participant_name.trim() {
        return Err(EventError::NameMismatch);
    }

    let updated = participation_repository::update_participation(
        &app_state.db,
        event.id,
        participation_id,
        &payload.selected_dates,
        payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()),
    )
    .await?
    .ok_or(EventError::ParticipationNotFound)?;

    info!("Response {} revised for event {}", updated.id, event.id);

    let _ = app_state
        .updates
        .send(EventUpdate::VoteRevised { event_id: event.id });

    Ok((StatusCode::OK, Json(updated)))
}

/// Edit-vs-create lookup: the first response matching the exact trimmed
/// name, or null. Names shorter than two characters never hit the store.
pub async fn lookup_participation(
    Extension(app_state): Extension<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<impl IntoResponse, EventError> {
    let event = event_repository::find_event_by_slug(&app_state.db, &slug)
        .await?
        .ok_or(EventError::EventNotFound)?;

    let name = query.name.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return Ok(Json(None));
    }

    let found =
        participation_repository::find_participation_by_name(&app_state.db, event.id, name).await?;

    Ok(Json(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn event_with_options(raw: &[&str]) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: "Team dinner".to_string(),
            description: None,
            slug: "abcDEF123456".to_string(),
            date_options: Json(raw.iter().map(|d| d.to_string()).collect()),
            creator: Uuid::new_v4(),
            closed_at: None,
            created_at: Utc::now(),
        }
    }

    fn vote(name: &str, dates: &[&str]) -> VoteRequest {
        VoteRequest {
            participant_name: name.to_string(),
            selected_dates: dates.iter().map(|d| d.to_string()).collect(),
            comment: None,
        }
    }

    #[test]
    fn accepts_a_valid_vote() {
        let event = event_with_options(&["2026-09-01", "2026-09-02"]);
        assert!(validate_vote(&event, &vote("Ana", &["2026-09-02"])).is_ok());
    }

    #[test]
    fn rejects_blank_and_oversized_names() {
        let event = event_with_options(&["2026-09-01"]);
        assert!(validate_vote(&event, &vote("   ", &["2026-09-01"])).is_err());

        let long = "x".repeat(MAX_PARTICIPANT_NAME_LEN + 1);
        assert!(validate_vote(&event, &vote(&long, &["2026-09-01"])).is_err());
    }

    #[test]
    fn rejects_empty_date_selection() {
        let event = event_with_options(&["2026-09-01"]);
        assert!(validate_vote(&event, &vote("Ana", &[])).is_err());
    }

    #[test]
    fn rejects_dates_outside_the_candidate_set() {
        let event = event_with_options(&["2026-09-01"]);
        assert!(validate_vote(&event, &vote("Ana", &["2026-09-02"])).is_err());
    }

    #[test]
    fn rejects_oversized_comments() {
        let event = event_with_options(&["2026-09-01"]);
        let mut payload = vote("Ana", &["2026-09-01"]);
        payload.comment = Some("x".repeat(MAX_COMMENT_LEN + 1));
        assert!(validate_vote(&event, &payload).is_err());

        payload.comment = Some("fine".to_string());
        assert!(validate_vote(&event, &payload).is_ok());
    }
}
