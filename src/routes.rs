//! HTTP endpoints: the activity inbox, a health probe, and profile lookup.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::activity::Activity;
use crate::adapter::BotAdapter;
use crate::profile::{USER_PROFILE, UserProfile};

/// Shared state for bot routes.
#[derive(Clone)]
pub struct BotRouteState {
    pub adapter: Arc<BotAdapter>,
}

/// POST /api/messages
///
/// Runs one turn and answers with the reply activities as a JSON array.
async fn post_messages(
    State(state): State<BotRouteState>,
    Json(activity): Json<Activity>,
) -> impl IntoResponse {
    tracing::debug!(
        kind = %activity.kind,
        channel = %activity.channel_id,
        "Inbound activity"
    );
    let replies = state.adapter.process_activity(activity).await;
    Json(replies)
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/profiles/{channel_id}/{user_id}
///
/// Returns the stored profile, or 404 if the user never confirmed an order.
async fn get_profile(
    State(state): State<BotRouteState>,
    Path((channel_id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let user_state = state.adapter.bot().user_state();
    match user_state
        .read_property::<UserProfile>(&channel_id, &user_id, USER_PROFILE)
        .await
    {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No profile stored for this user"})),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, channel_id = %channel_id, user_id = %user_id, "Profile lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Build the bot's HTTP routes.
pub fn bot_routes(state: BotRouteState) -> Router {
    Router::new()
        .route("/api/messages", post(post_messages))
        .route("/api/profiles/{channel_id}/{user_id}", get(get_profile))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
