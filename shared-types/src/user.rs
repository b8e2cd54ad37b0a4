use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A Gmail account registered with the backend
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub gmail_user_id: Option<String>,

    // OAuth tokens are stored on the row but never serialized out
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub access_token: Option<String>,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub refresh_token: Option<String>,
    pub token_expiry: Option<i64>,

    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Request to register a user from an OAuth token triple.
///
/// The account email is looked up from the provider profile, not supplied
/// by the caller.
#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateUserRequest {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<i64>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct UsersResponse {
    pub users: Vec<User>,
    pub total_count: i64,
}
