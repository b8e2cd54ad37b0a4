use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A Gmail label snapshot, scoped to one user
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Label {
    pub id: i64,
    pub user_id: i64,
    pub gmail_label_id: String,
    pub name: String,
    /// "system" or "user"
    pub label_type: String,
    pub messages_total: i32,
    pub messages_unread: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ListLabelsResponse {
    pub labels: Vec<Label>,
}
