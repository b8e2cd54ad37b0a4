use serde::{Deserialize, Serialize};

pub mod email;
pub mod label;
pub mod sync;
pub mod user;

pub use email::{Email, GetEmailLabelsResponse, ListEmailsRequest, ListEmailsResponse};
pub use label::{Label, ListLabelsResponse};
pub use sync::{SyncAllResponse, SyncResult, SyncState, SyncStatusView, SyncUserRequest};
pub use user::{CreateUserRequest, User, UsersResponse};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
