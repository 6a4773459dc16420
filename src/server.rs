//! Contestify HTTP server
//!
//! Assembles the REST routes over a shared [`AppState`] and serves them:
//! - Public listings, health check and session cookie endpoints
//! - Owner-scoped profile, history and stats endpoints
//! - Creator/admin contest management and review

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::routes::*;
use crate::api::AppState;

/// CORS for the browser client.
///
/// The credential travels in a cookie, so named origins get
/// `Access-Control-Allow-Credentials`. Without any configured origin every
/// origin is allowed, without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid client origin: {}", o);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn build_router(state: Arc<AppState>, origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health_check))
        // Session
        .route("/jwt", post(issue_token))
        .route("/clear-cookie", delete(clear_cookie))
        // Users
        .route("/users", get(list_users).put(upsert_user))
        // GET/PATCH address a user by email, DELETE by `_id`
        .route(
            "/users/:email",
            get(get_user).patch(update_profile).delete(delete_user),
        )
        .route("/change-role/:id", patch(change_role))
        // Contests
        .route("/contests", get(list_contests).post(create_contest))
        .route(
            "/contests/:id",
            get(get_contest)
                .put(update_contest)
                .patch(change_status)
                .delete(delete_contest),
        )
        .route("/all-contests", get(all_contests))
        .route("/my-contests/:email", get(my_contests))
        .route("/popular-contests", get(popular_contests))
        .route("/select-winner/:id", patch(select_winner))
        .route("/get-winners", get(get_winners))
        // Participations
        .route("/is-participated/:email", get(is_participated))
        .route("/total-submitted/:id", get(total_submitted))
        .route("/participate-contest", post(participate))
        .route("/participate-contest/:id", post(submit_task))
        .route("/user-stats/:email", get(user_stats))
        // Payments
        .route("/create-payment-intent", post(create_payment_intent))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(origins))
        .with_state(state)
}

// ============================================================================
// SERVER STARTUP
// ============================================================================

pub async fn run_server(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    origins: &[String],
) -> anyhow::Result<()> {
    let app = build_router(state, origins);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Contestify server listening on {}", addr);
    if origins.is_empty() {
        info!("CORS: any origin (no credentials)");
    } else {
        info!("CORS: {}", origins.join(", "));
    }

    axum::serve(listener, app).await?;

    Ok(())
}
