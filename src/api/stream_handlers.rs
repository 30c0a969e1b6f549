//! Server-Sent Events handler for the live feed of created users

use super::handlers::SharedState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tracing::debug;

/// SSE handler for `/users/stream`
///
/// Subscribes before the response is returned, so every user created after
/// the request is accepted shows up as one `data:` event. The subscription is
/// dropped together with the response body when the client goes away.
pub async fn stream_users(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.users.hub().subscribe();
    debug!(
        subscription_id = %subscription.id(),
        subscribers = state.users.hub().subscriber_count(),
        "SSE client connected"
    );

    let events = subscription.map(|user| Event::default().json_data(&user));

    Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive))
}
