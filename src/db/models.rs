use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Public sharing key, 12 random alphanumeric characters, immutable.
    pub slug: String,
    /// Candidate dates as `YYYY-MM-DD` strings, distinct, non-empty.
    pub date_options: Json<Vec<String>>,
    pub creator: Uuid,
    /// When set, voting is closed.
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventParticipation {
    pub id: Uuid,
    pub event: Uuid,
    pub participant_name: String,
    pub selected_dates: Json<Vec<String>>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
