use serde::{Deserialize, Serialize};
use serde_json::Value;
use sse::manager::DispatchReport;
use sse::message::{Message as SseMessage, MessageScope, UserKeys};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Body of `POST /notifications`.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct NotificationParams {
    /// Users to notify. Omit to broadcast to every connection.
    #[schema(example = json!(["user1", "user2"]))]
    pub(crate) user_ids: Option<Vec<String>>,
    /// Any JSON value; delivered verbatim as the event data.
    #[schema(value_type = Object, example = json!({ "message": "hi" }))]
    pub(crate) payload: Value,
}

impl NotificationParams {
    pub(crate) fn into_message(self) -> Result<SseMessage<Value>> {
        let scope = match self.user_ids {
            None => MessageScope::Broadcast,
            Some(user_ids) if user_ids.is_empty() => {
                return Err(Error::Invalid(
                    "user_ids must not be empty; omit it to broadcast".to_string(),
                ))
            }
            Some(user_ids) => MessageScope::Users {
                user_ids: UserKeys::from(user_ids),
            },
        };

        Ok(SseMessage {
            payload: self.payload,
            scope,
        })
    }
}

/// How many live connections a notification was written to.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct NotificationSummary {
    pub(crate) attempted: usize,
    pub(crate) delivered: usize,
}

impl From<DispatchReport> for NotificationSummary {
    fn from(report: DispatchReport) -> Self {
        Self {
            attempted: report.attempted,
            delivered: report.delivered,
        }
    }
}
