use crate::auth;
use crate::db::models::{Event, EventParticipation};
use crate::db::repositories::{event_repository, participation_repository};
use crate::error::EventError;
use crate::sse::broadcaster::EventUpdate;
use crate::startup::AppState;
use crate::tally::{self, AvailabilitySummary};
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

// Request/Response DTOs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub date_options: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub event: Event,
    pub participations: Vec<EventParticipation>,
    pub availability: AvailabilitySummary,
}

// Helper function to extract user_id from session
async fn require_user(session: &Session) -> Result<Uuid, EventError> {
    auth::session_user_id(session)
        .await
        .map_err(|_| EventError::Unauthorized)?
        .ok_or(EventError::Unauthorized)
}

pub(crate) fn validate_event_input(
    name: &str,
    description: Option<&str>,
    date_options: &[String],
) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Please enter an event name".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Event name must be at most {MAX_NAME_LEN} characters"));
    }
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(format!(
                "Description must be at most {MAX_DESCRIPTION_LEN} characters"
            ));
        }
    }
    if date_options.is_empty() {
        return Err("Please add at least one date option".to_string());
    }

    let mut seen = HashSet::new();
    for raw in date_options {
        if tally::parse_date(raw).is_none() {
            return Err(format!("'{raw}' is not a valid YYYY-MM-DD date"));
        }
        if !seen.insert(raw.as_str()) {
            return Err(format!("Date option '{raw}' is listed twice"));
        }
    }

    Ok(())
}

/// Create a new event (authenticated users only)
pub async fn create_event(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, EventError> {
    let user_id = require_user(&session).await?;

    validate_event_input(
        &payload.name,
        payload.description.as_deref(),
        &payload.date_options,
    )
    .map_err(EventError::InvalidRequest)?;

    let event = event_repository::create_event(
        &app_state.db,
        user_id,
        payload.name.trim(),
        payload.description.as_deref().map(str::trim),
        &payload.date_options,
    )
    .await?;

    info!("Event {} created with slug {}", event.id, event.slug);

    Ok((StatusCode::CREATED, Json(event)))
}

/// List the acting user's own events, newest first
pub async fn list_my_events(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<impl IntoResponse, EventError> {
    let user_id = require_user(&session).await?;

    let events = event_repository::list_events_by_creator(&app_state.db, user_id).await?;

    Ok((StatusCode::OK, Json(events)))
}

/// Public voting page data: the event, its responses in insertion order,
/// and the availability summary re-tallied from current store state.
pub async fn get_event(
    Extension(app_state): Extension<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, EventError> {
    let event = event_repository::find_event_by_slug(&app_state.db, &slug)
        .await?
        .ok_or(EventError::EventNotFound)?;

    let participations =
        participation_repository::list_participations_for_event(&app_state.db, event.id).await?;

    let availability = tally::tally_availability(&event.date_options.0, &participations);

    Ok((
        StatusCode::OK,
        Json(EventView {
            event,
            participations,
            availability,
        }),
    ))
}

/// Close voting (only the creator can close)
pub async fn close_event(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, EventError> {
    let user_id = require_user(&session).await?;

    let event = event_repository::find_event_by_slug(&app_state.db, &slug)
        .await?
        .ok_or(EventError::EventNotFound)?;

    if event.creator != user_id {
        return Err(EventError::Forbidden);
    }

    event_repository::close_event(&app_state.db, event.id).await?;

    let _ = app_state
        .updates
        .send(EventUpdate::EventClosed { event_id: event.id });

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Event closed"
        })),
    ))
}

/// Reopen voting (only the creator can reopen)
pub async fn reopen_event(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, EventError> {
    let user_id = require_user(&session).await?;

    let event = event_repository::find_event_by_slug(&app_state.db, &slug)
        .await?
        .ok_or(EventError::EventNotFound)?;

    if event.creator != user_id {
        return Err(EventError::Forbidden);
    }

    event_repository::reopen_event(&app_state.db, event.id).await?;

    let _ = app_state
        .updates
        .send(EventUpdate::EventReopened { event_id: event.id });

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Event reopened"
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn accepts_a_plain_event() {
        assert!(
            validate_event_input("Team dinner", None, &dates(&["2026-09-01", "2026-09-02"]))
                .is_ok()
        );
    }

    #[test]
    fn rejects_empty_or_oversized_names() {
        assert!(validate_event_input("   ", None, &dates(&["2026-09-01"])).is_err());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_event_input(&long, None, &dates(&["2026-09-01"])).is_err());
    }

    #[test]
    fn rejects_empty_date_options() {
        assert!(validate_event_input("Team dinner", None, &[]).is_err());
    }

    #[test]
    fn rejects_malformed_and_duplicate_dates() {
        assert!(validate_event_input("Team dinner", None, &dates(&["09/01/2026"])).is_err());
        assert!(
            validate_event_input("Team dinner", None, &dates(&["2026-09-01", "2026-09-01"]))
                .is_err()
        );
    }

    #[test]
    fn rejects_oversized_description() {
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(
            validate_event_input("Team dinner", Some(&long), &dates(&["2026-09-01"])).is_err()
        );
    }
}
