use serde::Deserialize;
use sse::message::UserKeys;
use utoipa::IntoParams;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct SubscribeParams {
    /// A single user id or a comma separated list, e.g. `user1,user2`.
    #[serde(rename = "userId")]
    #[param(example = "user1,user2")]
    pub(crate) user_id: String,
}

impl SubscribeParams {
    /// The user key the new connection is registered under. Whitespace and
    /// empty list entries are dropped; the list order is kept.
    pub(crate) fn user_key(&self) -> Result<String> {
        let user_ids = UserKeys::parse_query_param(&self.user_id);
        if user_ids.is_empty() {
            return Err(Error::Invalid("userId must not be empty".to_string()));
        }
        Ok(user_ids.to_query_param())
    }
}
