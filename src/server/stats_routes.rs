//! Listening statistics routes. All endpoints are grouped/aggregated views
//! over the caller's persisted streaming records.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::server::session::Session;
use crate::server::state::{GuardedHistoryStore, ServerState};

const TOP_LIST_LIMIT: usize = 10;
const DISTRIBUTION_LIMIT: usize = 8;

fn stats_response<T: Serialize>(result: anyhow::Result<T>, what: &str) -> Response {
    match result {
        Ok(data) => Json(json!({"success": true, "data": data})).into_response(),
        Err(err) => {
            warn!("Failed to fetch {}: {}", what, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": format!("Failed to fetch {}", what),
                })),
            )
                .into_response()
        }
    }
}

async fn top_artists(session: Session, State(store): State<GuardedHistoryStore>) -> Response {
    stats_response(
        store.get_top_artists(session.user_id, TOP_LIST_LIMIT),
        "top artists",
    )
}

async fn top_albums(session: Session, State(store): State<GuardedHistoryStore>) -> Response {
    stats_response(
        store.get_top_albums(session.user_id, TOP_LIST_LIMIT),
        "top albums",
    )
}

async fn top_songs(session: Session, State(store): State<GuardedHistoryStore>) -> Response {
    stats_response(
        store.get_top_tracks(session.user_id, TOP_LIST_LIMIT),
        "top songs",
    )
}

async fn summary(session: Session, State(store): State<GuardedHistoryStore>) -> Response {
    match store.get_listening_summary(session.user_id) {
        // No records yet: an empty object, not a zeroed summary.
        Ok(None) => Json(json!({"success": true, "data": {}})).into_response(),
        Ok(Some(summary)) => Json(json!({"success": true, "data": summary})).into_response(),
        Err(err) => stats_response::<()>(Err(err), "summary stats"),
    }
}

async fn monthly_activity(session: Session, State(store): State<GuardedHistoryStore>) -> Response {
    stats_response(store.get_monthly_activity(session.user_id), "monthly activity")
}

async fn daily_patterns(session: Session, State(store): State<GuardedHistoryStore>) -> Response {
    stats_response(store.get_daily_patterns(session.user_id), "daily patterns")
}

async fn artist_distribution(
    session: Session,
    State(store): State<GuardedHistoryStore>,
) -> Response {
    stats_response(
        store.get_artist_distribution(session.user_id, DISTRIBUTION_LIMIT),
        "artist distribution",
    )
}

pub fn stats_routes() -> Router<ServerState> {
    Router::new()
        .route("/top-artists", get(top_artists))
        .route("/top-albums", get(top_albums))
        .route("/top-songs", get(top_songs))
        .route("/summary", get(summary))
        .route("/monthly-activity", get(monthly_activity))
        .route("/daily-patterns", get(daily_patterns))
        .route("/artist-distribution", get(artist_distribution))
}
