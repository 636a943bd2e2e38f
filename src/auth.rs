use crate::db::connection::is_unique_violation;
use crate::db::repositories::user_repository;
use crate::error::AuthError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info};
use uuid::Uuid;

pub const SESSION_USER_KEY: &str = "user_id";

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

pub async fn session_user_id(session: &Session) -> Result<Option<Uuid>, AuthError> {
    session
        .get::<Uuid>(SESSION_USER_KEY)
        .await
        .map_err(|_| AuthError::SessionError)
}

/// The pre-insert existence check races with concurrent registrations;
/// the unique constraint on `email` is the authority, so its violation
/// still surfaces as the duplicate-email conflict.
fn create_user_error(error: sqlx::Error) -> AuthError {
    if is_unique_violation(&error) {
        AuthError::EmailTaken
    } else {
        AuthError::DatabaseError(error.to_string())
    }
}

pub async fn register(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.len() > 255 {
        return Err(AuthError::InvalidRequest("A valid email is required".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(AuthError::InvalidRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    if user_repository::find_user_by_email(&app_state.db, &email)
        .await?
        .is_some()
    {
        return Err(AuthError::EmailTaken);
    }

    let password_hash =
        bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST).map_err(|e| {
            error!("bcrypt hash failed: {e}");
            AuthError::HashingError
        })?;

    let user = user_repository::create_user(&app_state.db, &email, &password_hash)
        .await
        .map_err(create_user_error)?;

    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|_| AuthError::SessionError)?;

    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_lowercase();

    let user = user_repository::find_user_by_email(&app_state.db, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let valid = bcrypt::verify(&payload.password, &user.password_hash).map_err(|e| {
        error!("bcrypt verify failed: {e}");
        AuthError::HashingError
    })?;
    if !valid {
        return Err(AuthError::InvalidCredentials);
    }

    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|_| AuthError::SessionError)?;

    info!("User {} logged in", user.id);

    Ok((
        StatusCode::OK,
        Json(UserResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, AuthError> {
    session.flush().await.map_err(|_| AuthError::SessionError)?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Logged out"
        })),
    ))
}

pub async fn me(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AuthError> {
    let user_id = session_user_id(&session)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let user = user_repository::find_user_by_id(&app_state.db, user_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::ErrorKind;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct FakeDbError(&'static str);

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "database error {}", self.0)
        }
    }

    impl StdError for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                "23505" => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    #[test]
    fn duplicate_email_insert_maps_to_email_taken() {
        // A concurrent registration slipping past the pre-insert check
        // hits the unique constraint; that must still be a conflict, not
        // a plain database error.
        let race = sqlx::Error::Database(Box::new(FakeDbError("23505")));
        assert!(matches!(create_user_error(race), AuthError::EmailTaken));
    }

    #[test]
    fn other_insert_failures_stay_database_errors() {
        let fk = sqlx::Error::Database(Box::new(FakeDbError("23503")));
        assert!(matches!(
            create_user_error(fk),
            AuthError::DatabaseError(_)
        ));

        assert!(matches!(
            create_user_error(sqlx::Error::RowNotFound),
            AuthError::DatabaseError(_)
        ));
    }
}

