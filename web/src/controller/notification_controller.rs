use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::controller::ApiResponse;
use crate::params::notification::{NotificationParams, NotificationSummary};
use crate::{AppState, Error};
use log::*;

/// POST push a notification to some users, or to everyone when `user_ids` is omitted
#[utoipa::path(
    post,
    path = "/notifications",
    request_body = NotificationParams,
    responses(
        (status = 202, description = "Notification written to every matching live connection", body = NotificationSummary),
        (status = 422, description = "Unprocessable Entity"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<NotificationParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST push notification: {params:?}");

    let message = params.into_message()?;
    let report = app_state.sse_manager.send_message(message);

    info!(
        "Notification delivered to {}/{} connection(s)",
        report.delivered, report.attempted
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            NotificationSummary::from(report),
        )),
    ))
}
