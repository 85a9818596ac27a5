//! SSE HTTP handler for the web layer.
//!
//! Only the Axum glue lives here: turning a request into a `Subscription`
//! and its response body into a close signal. Registry, dispatch and framing
//! live in the `sse` crate.

pub mod handler;
pub(crate) mod subscription;
