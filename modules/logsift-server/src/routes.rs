//! HTTP boundary. Translates requests into enqueue calls and cache reads;
//! never touches the store directly.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;

use logsift_common::PublishBody;

use crate::context::AppContext;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/publish", post(publish))
        .route("/events", get(get_events))
        .route("/stats", get(get_stats))
        .route("/health", get(health))
        .with_state(ctx)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

/// Accept one event or a batch. Every event is validated before any side
/// effect; one bad event rejects the whole submission and nothing is
/// counted or enqueued. On success `received` is bumped first, then each
/// event is enqueued; the reply never waits on processing.
async fn publish(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<PublishBody>,
) -> impl IntoResponse {
    let events = body.into_events();

    for event in &events {
        if let Err(err) = event.validate() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            )
                .into_response();
        }
    }

    let n = events.len();
    ctx.cache.add_received(n as u64).await;
    for event in events {
        ctx.queue.enqueue(event);
    }

    Json(json!({
        "status": "accepted",
        "received": n,
        "queued": n,
    }))
    .into_response()
}

async fn get_events(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let topic = params.get("topic").map(String::as_str);
    let events = ctx.cache.events_sorted(topic).await;

    match topic {
        Some(topic) => Json(json!({
            "topic": topic,
            "count": events.len(),
            "events": events,
        })),
        None => Json(json!({
            "count": events.len(),
            "events": events,
        })),
    }
}

async fn get_stats(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(ctx.cache.snapshot(ctx.uptime()).await)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}
