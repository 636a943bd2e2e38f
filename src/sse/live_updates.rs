use crate::db::repositories::{event_repository, participation_repository};
use crate::sse::broadcaster::EventUpdate;
use crate::startup::AppState;
use crate::tally;
use axum::{
    extract::{Extension, Path},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::db::connection::DbPool;

async fn availability_json(pool: &DbPool, event_id: Uuid) -> Result<String, sqlx::Error> {
    let participations =
        participation_repository::list_participations_for_event(pool, event_id).await?;
    let event = event_repository::find_event_by_id(pool, event_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let summary = tally::tally_availability(&event.date_options.0, &participations);
    Ok(json!({
        "availability": summary,
        "response_count": participations.len(),
    })
    .to_string())
}

/// Live availability for one event: an `init` snapshot, then a freshly
/// re-tallied `availability` event after every response create/update,
/// plus closed/reopened notifications.
pub async fn event_live(
    Extension(app_state): Extension<AppState>,
    Path(slug): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.updates.subscribe();

    let stream = async_stream::stream! {
        let event_id = match event_repository::find_event_by_slug(&app_state.db, &slug).await {
            Ok(Some(event)) => event.id,
            Ok(None) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Event not found"}).to_string()));
                return;
            }
            Err(_) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Database error"}).to_string()));
                return;
            }
        };

        match availability_json(&app_state.db, event_id).await {
            Ok(data) => {
                yield Ok(Event::default().event("init").data(data));
            }
            Err(_) => {
                yield Ok(Event::default()
                    .event("error")
                    .data(json!({"error": "Failed to load availability"}).to_string()));
            }
        }

        loop {
            let update = match rx.recv().await {
                Ok(update) => update,
                // A lagged subscriber just missed some updates; the next
                // one re-tallies from store state anyway.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };

            if update.event_id() != event_id {
                continue;
            }

            match update {
                EventUpdate::VoteSubmitted { .. } | EventUpdate::VoteRevised { .. } => {
                    match availability_json(&app_state.db, event_id).await {
                        Ok(data) => {
                            yield Ok(Event::default().event("availability").data(data));
                        }
                        Err(err) => {
                            warn!("failed to re-tally availability for event {event_id}: {err}");
                        }
                    }
                }
                EventUpdate::EventClosed { .. } => {
                    yield Ok(Event::default()
                        .event("event_closed")
                        .data(json!({"event_id": event_id}).to_string()));
                }
                EventUpdate::EventReopened { .. } => {
                    yield Ok(Event::default()
                        .event("event_reopened")
                        .data(json!({"event_id": event_id}).to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
