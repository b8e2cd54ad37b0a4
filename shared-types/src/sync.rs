use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle of a user's background sync.
///
/// `NeverSynced` is read-side only: it is reported when no sync status row
/// exists yet and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    NeverSynced,
    Pending,
    Running,
    Completed,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::NeverSynced => "never_synced",
            SyncState::Pending => "pending",
            SyncState::Running => "running",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "running" => SyncState::Running,
            "completed" => SyncState::Completed,
            "failed" => SyncState::Failed,
            _ => SyncState::Pending,
        }
    }
}

/// Outcome of one orchestrated sync run.
///
/// Always returned as a value, even on failure: callers branch on `status`
/// rather than catching errors.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncResult {
    pub user_id: i64,
    pub status: SyncState,
    pub emails_synced: i64,
    pub labels_synced: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Current sync status of a user, as exposed over the API
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SyncStatusView {
    pub user_id: i64,
    pub status: SyncState,
    pub last_sync: Option<i64>,
    pub emails_synced: i64,
    pub error_message: Option<String>,
}

/// Payload of the sync-user task callback
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncUserRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct SyncAllResponse {
    pub scheduled: usize,
}
