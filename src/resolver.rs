//! Participation resolver: maps the name a participant is typing to at
//! most one existing response, so the form can flip between create and
//! edit mode without firing a store query per keystroke.
//!
//! One cooperatively scheduled loop owns the debounce deadline. Every
//! keystroke resets the deadline rather than queueing a timer, so at most
//! one lookup runs per quiescence window, and a keystroke that arrives
//! while a lookup is in flight supersedes its result.

use axum::{
    extract::{
        Extension, Path, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use serde::Serialize;
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant, sleep_until};
use tracing::warn;
use uuid::Uuid;

use crate::db::connection::DbPool;
use crate::db::models::EventParticipation;
use crate::db::repositories::{event_repository, participation_repository};
use crate::error::EventError;
use crate::startup::AppState;

/// Quiescence window after the last keystroke before a lookup fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Names shorter than this (after trimming) never trigger a lookup.
pub const MIN_NAME_CHARS: usize = 2;

pub trait ParticipationLookup: Send + 'static {
    fn find_by_name(
        &self,
        event_id: Uuid,
        name: &str,
    ) -> impl Future<Output = Result<Option<EventParticipation>, sqlx::Error>> + Send;
}

/// Store-backed lookup used by the live form sessions.
#[derive(Clone)]
pub struct StoreLookup {
    pool: DbPool,
}

impl StoreLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ParticipationLookup for StoreLookup {
    async fn find_by_name(
        &self,
        event_id: Uuid,
        name: &str,
    ) -> Result<Option<EventParticipation>, sqlx::Error> {
        participation_repository::find_participation_by_name(&self.pool, event_id, name).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormMode {
    #[default]
    Create,
    Edit {
        #[serde(rename = "participationId")]
        participation_id: Uuid,
    },
}

/// The working selection the form renders. In edit mode it is
/// pre-populated from the matched response, overwriting unsaved edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(flatten)]
    pub mode: FormMode,
    pub selected_dates: Vec<String>,
    pub comment: Option<String>,
}

pub struct NameResolver {
    keystrokes: mpsc::Sender<String>,
    state: watch::Receiver<FormState>,
}

impl NameResolver {
    pub fn spawn<L: ParticipationLookup>(lookup: L, event_id: Uuid) -> Self {
        let (keystrokes, rx) = mpsc::channel(32);
        let (state_tx, state) = watch::channel(FormState::default());

        tokio::spawn(run_resolver(lookup, event_id, rx, state_tx));

        Self { keystrokes, state }
    }

    /// Called on every change to the name field.
    pub async fn name_changed(&self, name: impl Into<String>) {
        let _ = self.keystrokes.send(name.into()).await;
    }

    pub fn current(&self) -> FormState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.clone()
    }
}

async fn run_resolver<L: ParticipationLookup>(
    lookup: L,
    event_id: Uuid,
    mut keystrokes: mpsc::Receiver<String>,
    state: watch::Sender<FormState>,
) {
    let mut pending: Option<String> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            msg = keystrokes.recv() => match msg {
                Some(raw) => note_keystroke(&raw, &mut pending, &mut deadline, &state),
                None => break,
            },
            _ = sleep_until(deadline), if pending.is_some() => {
                let Some(name) = pending.take() else { continue };

                let result = lookup.find_by_name(event_id, &name).await;

                // Keystrokes that arrived while the lookup ran supersede
                // its result: restart the debounce and drop the result.
                let mut superseded = false;
                while let Ok(raw) = keystrokes.try_recv() {
                    superseded = true;
                    note_keystroke(&raw, &mut pending, &mut deadline, &state);
                }
                if superseded {
                    continue;
                }

                let next = match result {
                    Ok(Some(found)) => FormState {
                        mode: FormMode::Edit { participation_id: found.id },
                        selected_dates: found.selected_dates.0.clone(),
                        comment: found.comment.clone(),
                    },
                    Ok(None) => FormState::default(),
                    Err(e) => {
                        // Not user-facing; the user keeps typing or
                        // submits as a new response.
                        warn!("participation lookup for event {event_id} failed: {e}");
                        FormState::default()
                    }
                };
                let _ = state.send(next);
            }
        }
    }
}

/// WebSocket form session for the voting page: the client sends the name
/// field's value on every change, the server answers with the resolved
/// create/edit form state.
pub async fn form_session(
    Extension(app_state): Extension<AppState>,
    Path(slug): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, EventError> {
    let event = event_repository::find_event_by_slug(&app_state.db, &slug)
        .await?
        .ok_or(EventError::EventNotFound)?;

    Ok(ws.on_upgrade(move |socket| handle_form_session(socket, app_state, event.id)))
}

async fn handle_form_session(mut socket: WebSocket, app_state: AppState, event_id: Uuid) {
    let resolver = NameResolver::spawn(StoreLookup::new(app_state.db.clone()), event_id);
    let mut states = resolver.subscribe();

    // Initial snapshot so the client starts from a known state.
    if send_state(&mut socket, &resolver.current()).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(name))) => resolver.name_changed(name).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if send_state(&mut socket, &state).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_state(socket: &mut WebSocket, state: &FormState) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(payload)).await
}

fn note_keystroke(
    raw: &str,
    pending: &mut Option<String>,
    deadline: &mut Instant,
    state: &watch::Sender<FormState>,
) {
    let name = raw.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        // Too short to identify anyone: no lookup, and any previously
        // loaded edit state is cleared right away.
        *pending = None;
        let _ = state.send(FormState::default());
    } else {
        *pending = Some(name.to_string());
        *deadline = Instant::now() + DEBOUNCE_WINDOW;
    }
}
