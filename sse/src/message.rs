use crate::connection::UserId;
use serde::Serialize;

/// One or more user ids, normalized to a list that keeps the caller's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserKeys(Vec<UserId>);

impl UserKeys {
    pub fn new(user_ids: Vec<UserId>) -> Self {
        Self(user_ids)
    }

    /// Parse a `userId` query value such as `user1,user2`.
    pub fn parse_query_param(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Comma-joined form used in the subscription URL.
    pub fn to_query_param(&self) -> String {
        self.0.join(",")
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for UserKeys {
    fn from(user_id: &str) -> Self {
        Self(vec![user_id.to_string()])
    }
}

impl From<String> for UserKeys {
    fn from(user_id: String) -> Self {
        Self(vec![user_id])
    }
}

impl From<&String> for UserKeys {
    fn from(user_id: &String) -> Self {
        Self(vec![user_id.clone()])
    }
}

impl From<Vec<String>> for UserKeys {
    fn from(user_ids: Vec<String>) -> Self {
        Self(user_ids)
    }
}

impl From<Vec<&str>> for UserKeys {
    fn from(user_ids: Vec<&str>) -> Self {
        Self(user_ids.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for UserKeys {
    fn from(user_ids: &[&str]) -> Self {
        Self(user_ids.iter().map(|id| id.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for UserKeys {
    fn from(user_ids: [&str; N]) -> Self {
        Self(user_ids.iter().map(|id| id.to_string()).collect())
    }
}

impl<'a> IntoIterator for &'a UserKeys {
    type Item = &'a UserId;
    type IntoIter = std::slice::Iter<'a, UserId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Message<T: Serialize> {
    pub payload: T,
    pub scope: MessageScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageScope {
    /// Send to every connection of the listed users
    Users { user_ids: UserKeys },
    /// Send to all connections
    Broadcast,
}
