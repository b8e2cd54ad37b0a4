use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::label::Label;

/// A cached Gmail message
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Email {
    pub id: i64,
    pub user_id: i64,

    // Gmail identifiers
    pub gmail_message_id: String,
    pub thread_id: Option<String>,

    // Headers
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,

    // Dates (epoch millis)
    pub date_sent: Option<i64>,
    pub date_received: Option<i64>,

    // Content
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub snippet: Option<String>,

    // Flags
    pub is_read: bool,
    pub is_important: bool,
    pub is_starred: bool,

    // Metadata
    #[ts(type = "any")]
    pub raw_headers: Option<serde_json::Value>,
    pub attachments_count: i32,

    // Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

/// Request to list cached emails
#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct ListEmailsRequest {
    pub user_id: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Response for email list
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ListEmailsResponse {
    pub emails: Vec<Email>,
    pub total_count: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct GetEmailLabelsResponse {
    pub email_id: i64,
    pub labels: Vec<Label>,
}
