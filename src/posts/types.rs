use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for create and update.
///
/// `title` stays an untyped JSON value so that a wrong type surfaces as a
/// field error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub title: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCollection {
    pub data: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: usize,
    pub per_page: usize,
    pub total: usize,
    pub last_page: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostsQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// On-disk layout of the store's data file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub next_id: u64,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostsConfig {
    /// Page size used when a list request asks for a page without `per_page`.
    pub per_page: usize,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self { per_page: 15 }
    }
}
