use crate::startup::{AppState, Config};
use axum::{
    Router,
    extract::Extension,
    http::{
        StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, patch, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{
    Expiry, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};
use tower_sessions_sqlx_store::PostgresStore;

#[macro_use]
extern crate tracing;

mod auth;
mod db;
mod error;
mod events;
mod participations;
mod resolver;
mod sse;
mod startup;
mod tally;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let pool = db::init_db(&config.database_url)
        .await
        .expect("Unable to connect to database");

    let session_store = PostgresStore::new(pool.clone());
    session_store
        .migrate()
        .await
        .expect("Unable to migrate session store");

    let app_state = AppState::new(pool);

    // build our application with a route
    let app = Router::new()
        .route("/api/users/register", post(auth::register))
        .route("/api/users/login", post(auth::login))
        .route("/api/users/logout", post(auth::logout))
        .route("/api/users/me", get(auth::me))
        .route("/api/events", post(events::create_event))
        .route("/api/events/mine", get(events::list_my_events))
        .route("/api/events/:slug", get(events::get_event))
        .route("/api/events/:slug/close", post(events::close_event))
        .route("/api/events/:slug/reopen", post(events::reopen_event))
        .route(
            "/api/events/:slug/participations",
            post(participations::submit_vote),
        )
        .route(
            "/api/events/:slug/participations/lookup",
            get(participations::lookup_participation),
        )
        .route(
            "/api/events/:slug/participations/:id",
            patch(participations::revise_vote),
        )
        .route("/api/events/:slug/live", get(sse::event_live))
        .route(
            "/api/events/:slug/form-session",
            get(resolver::form_session),
        )
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    axum::http::Method::POST,
                    axum::http::Method::GET,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .layer(
            SessionManagerLayer::new(session_store)
                .with_name("rdv_session")
                .with_same_site(SameSite::Lax)
                .with_secure(false) // TODO: set to true behind HTTPS in production
                .with_expiry(Expiry::OnInactivity(Duration::days(7))),
        )
        .fallback(handler_404);

    info!("listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app).await.unwrap();
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
