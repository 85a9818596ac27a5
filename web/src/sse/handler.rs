use super::subscription::{CloseGuard, Subscription};
use crate::error::{Error, Result};
use crate::params::subscription::SubscribeParams;
use async_stream::stream;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::response::Response;
use bytes::Bytes;
use futures::Stream;
use log::*;
use service::AppState;
use sse::codec;
use sse::connection::{Connection, ConnectionId};
use sse::sink::{ChannelSink, Chunk, ResponseHead};
use sse::Manager;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, Instant};

/// GET subscribe to pushed events for one or more users
#[utoipa::path(
    get,
    path = "/sse/events",
    params(SubscribeParams),
    responses(
        (status = 200, description = "Long-lived stream of `data: <json>` events", content_type = "text/event-stream", body = String),
        (status = 400, description = "Missing userId query parameter"),
        (status = 422, description = "Blank userId query parameter"),
    )
)]
pub(crate) async fn sse_handler(
    Query(params): Query<SubscribeParams>,
    State(app_state): State<AppState>,
) -> Result<Response> {
    let user_key = params.user_key()?;
    debug!("Establishing SSE connection for user(s) {}", user_key);

    let (sink, mut rx) = ChannelSink::channel();
    let (head, close_guard) = accept(&app_state.sse_manager, user_key, sink, &mut rx)?;
    let body = event_stream(rx, close_guard, app_state.config.sse_keep_alive());

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;

    Ok(response)
}

/// Register a subscriber writing into `sink` and take the response head the
/// lifecycle wrote to `rx`.
fn accept(
    manager: &Manager,
    user_key: String,
    sink: ChannelSink,
    rx: &mut UnboundedReceiver<Chunk>,
) -> Result<(ResponseHead, CloseGuard)> {
    let mut subscription = Subscription::new(user_key);
    manager.accept_subscription(&mut subscription, Arc::new(sink), |subscription, sink| {
        Connection::new(ConnectionId::new(), subscription.user_key.clone(), sink)
    });

    // Owns the close hooks from here on, so an early return still deregisters
    let close_guard = subscription.into_close_guard();

    // The lifecycle writes the head synchronously, before any frame
    match rx.try_recv() {
        Ok(Chunk::Head(head)) => Ok((head, close_guard)),
        _ => Err(Error::Internal(
            "SSE response head was not written".to_string(),
        )),
    }
}

/// Body of a subscription: frames from the channel, interleaved with
/// keep-alive comments when the connection is idle.
fn event_stream(
    mut rx: UnboundedReceiver<Chunk>,
    close_guard: CloseGuard,
    keep_alive: Option<Duration>,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
    stream! {
        // Dropped together with the stream, which deregisters the connection
        let _close_guard = close_guard;
        let mut ticker = keep_alive.map(|period| interval_at(Instant::now() + period, period));

        loop {
            let chunk = match ticker.as_mut() {
                Some(ticker) => tokio::select! {
                    chunk = rx.recv() => chunk,
                    _ = ticker.tick() => {
                        Some(Chunk::Data(Bytes::from_static(codec::keep_alive().as_bytes())))
                    }
                },
                None => rx.recv().await,
            };

            match chunk {
                Some(Chunk::Data(bytes)) => yield Ok::<Bytes, Infallible>(bytes),
                Some(Chunk::Head(_)) => warn!("Ignoring a second SSE response head"),
                None => break,
            }
        }

        debug!("SSE event stream ended");
    }
}
