//! Gmail REST API client behind the `MailProvider` trait.
//!
//! A fresh provider is built per sync run from the user's stored token
//! triple, so credentials are never shared across concurrent runs.

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// OAuth token triple reconstructed from the user row.
/// Not validated against the provider until the first request.
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub email_address: String,
}

#[derive(Debug, Clone)]
pub struct ProviderLabel {
    pub id: String,
    pub name: String,
    /// "system" or "user"
    pub label_type: String,
    pub messages_total: i32,
    pub messages_unread: i32,
}

/// A provider message flattened into the shape the reconciler stores
#[derive(Debug, Clone, Default)]
pub struct NormalizedEmail {
    pub id: String,
    pub thread_id: Option<String>,
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub date_sent: Option<i64>,
    pub date_received: Option<i64>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub snippet: Option<String>,
    pub is_read: bool,
    pub is_important: bool,
    pub is_starred: bool,
    pub headers: Option<serde_json::Value>,
    pub label_ids: Vec<String>,
    pub attachments_count: i32,
}

#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub emails: Vec<NormalizedEmail>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Gmail API returned status {status}: {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn get_profile(&self) -> Result<ProviderProfile>;

    async fn list_labels(&self) -> Result<Vec<ProviderLabel>>;

    /// Fetch one page of messages, newest first. `page_token` continues a
    /// previous page; `next_page_token` in the result is None on the last
    /// page.
    async fn list_messages(
        &self,
        query: Option<&str>,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<MessagePage>;
}

/// Builds one provider per sync run from that run's credentials
pub trait MailProviderFactory: Send + Sync {
    fn create(&self, credentials: GmailCredentials) -> Box<dyn MailProvider>;
}

pub struct GmailClient {
    http: reqwest::Client,
    credentials: GmailCredentials,
}

impl GmailClient {
    pub fn new(http: reqwest::Client, credentials: GmailCredentials) -> Self {
        Self { http, credentials }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(params)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn get_profile(&self) -> Result<ProviderProfile> {
        let profile: ProfileResponse = self
            .get_json(&format!("{GMAIL_BASE_URL}/users/me/profile"), &[])
            .await?;

        Ok(ProviderProfile {
            email_address: profile.email_address,
        })
    }

    async fn list_labels(&self) -> Result<Vec<ProviderLabel>> {
        let response: ListLabelsResponse = self
            .get_json(&format!("{GMAIL_BASE_URL}/users/me/labels"), &[])
            .await?;

        let labels = response
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|label| ProviderLabel {
                id: label.id,
                name: label.name,
                label_type: label.label_type.unwrap_or_else(|| "user".to_string()),
                messages_total: label.messages_total.unwrap_or(0),
                messages_unread: label.messages_unread.unwrap_or(0),
            })
            .collect();

        Ok(labels)
    }

    async fn list_messages(
        &self,
        query: Option<&str>,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        // The API caps a single page at 500 ids
        let mut params = vec![("maxResults", max_results.min(500).to_string())];
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let list: ListMessagesResponse = self
            .get_json(&format!("{GMAIL_BASE_URL}/users/me/messages"), &params)
            .await?;

        let mut emails = Vec::new();
        for message_ref in list.messages.unwrap_or_default() {
            let message: GmailMessage = self
                .get_json(
                    &format!("{GMAIL_BASE_URL}/users/me/messages/{}", message_ref.id),
                    &[("format", "full".to_string())],
                )
                .await?;
            emails.push(normalize_message(message));
        }

        Ok(MessagePage {
            emails,
            next_page_token: list.next_page_token,
        })
    }
}

/// Shares one HTTP connection pool across per-run clients
pub struct GmailProviderFactory {
    http: reqwest::Client,
}

impl GmailProviderFactory {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for GmailProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MailProviderFactory for GmailProviderFactory {
    fn create(&self, credentials: GmailCredentials) -> Box<dyn MailProvider> {
        Box::new(GmailClient::new(self.http.clone(), credentials))
    }
}

// ---- Gmail wire types ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ListLabelsResponse {
    labels: Option<Vec<GmailLabel>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailLabel {
    id: String,
    name: String,
    #[serde(rename = "type")]
    label_type: Option<String>,
    messages_total: Option<i32>,
    messages_unread: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesResponse {
    messages: Option<Vec<MessageRef>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    thread_id: Option<String>,
    label_ids: Option<Vec<String>>,
    snippet: Option<String>,
    /// Epoch millis as a decimal string
    internal_date: Option<String>,
    payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    mime_type: Option<String>,
    filename: Option<String>,
    headers: Option<Vec<Header>>,
    body: Option<PartBody>,
    parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PartBody {
    data: Option<String>,
}

// ---- Normalization ----

fn normalize_message(message: GmailMessage) -> NormalizedEmail {
    let label_ids = message.label_ids.unwrap_or_default();
    let payload = message.payload.unwrap_or_default();

    let headers_json = payload.headers.as_ref().map(|headers| {
        serde_json::Value::Object(
            headers
                .iter()
                .map(|h| (h.name.clone(), serde_json::Value::String(h.value.clone())))
                .collect(),
        )
    });

    let date_sent = extract_header(&payload, "Date")
        .and_then(|value| chrono::DateTime::parse_from_rfc2822(&value).ok())
        .map(|dt| dt.timestamp_millis());
    let date_received = message
        .internal_date
        .as_deref()
        .and_then(|millis| millis.parse::<i64>().ok());

    let mut body_text = None;
    let mut body_html = None;
    let mut attachments_count = 0;
    extract_bodies(&payload, &mut body_text, &mut body_html, &mut attachments_count);

    NormalizedEmail {
        thread_id: message.thread_id,
        subject: extract_header(&payload, "Subject"),
        sender: extract_header(&payload, "From"),
        recipient: extract_header(&payload, "To"),
        cc: extract_header(&payload, "Cc"),
        bcc: extract_header(&payload, "Bcc"),
        date_sent,
        date_received,
        body_text,
        body_html,
        snippet: message.snippet,
        is_read: !label_ids.iter().any(|l| l == "UNREAD"),
        is_important: label_ids.iter().any(|l| l == "IMPORTANT"),
        is_starred: label_ids.iter().any(|l| l == "STARRED"),
        headers: headers_json,
        label_ids,
        attachments_count,
        id: message.id,
    }
}

fn extract_header(payload: &MessagePart, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Walk the MIME tree collecting the first text/plain and text/html bodies
/// and counting named attachment parts.
fn extract_bodies(
    part: &MessagePart,
    body_text: &mut Option<String>,
    body_html: &mut Option<String>,
    attachments_count: &mut i32,
) {
    if part.filename.as_deref().is_some_and(|f| !f.is_empty()) {
        *attachments_count += 1;
    }

    if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
        match part.mime_type.as_deref() {
            Some(mime) if mime.starts_with("text/plain") && body_text.is_none() => {
                *body_text = decode_base64_body(data);
            }
            Some(mime) if mime.starts_with("text/html") && body_html.is_none() => {
                *body_html = decode_base64_body(data);
            }
            _ => {}
        }
    }

    for child in part.parts.iter().flatten() {
        extract_bodies(child, body_text, body_html, attachments_count);
    }
}

/// Gmail uses URL-safe base64 but padding varies, so try multiple decoders
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
    use base64::Engine;

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            if let Ok(text) = String::from_utf8(decoded) {
                return Some(text);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn header(name: &str, value: &str) -> Header {
        Header {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_normalize_multipart_message() {
        let message = GmailMessage {
            id: "m1".to_string(),
            thread_id: Some("t1".to_string()),
            label_ids: Some(vec!["INBOX".to_string(), "STARRED".to_string()]),
            snippet: Some("Hello there".to_string()),
            internal_date: Some("1700000000000".to_string()),
            payload: Some(MessagePart {
                mime_type: Some("multipart/alternative".to_string()),
                headers: Some(vec![
                    header("Subject", "Greetings"),
                    header("From", "alice@example.com"),
                    header("To", "bob@example.com"),
                    header("Date", "Tue, 14 Nov 2023 22:13:20 +0000"),
                ]),
                parts: Some(vec![
                    MessagePart {
                        mime_type: Some("text/plain".to_string()),
                        body: Some(PartBody {
                            data: Some(URL_SAFE_NO_PAD.encode("plain body")),
                        }),
                        ..Default::default()
                    },
                    MessagePart {
                        mime_type: Some("text/html".to_string()),
                        body: Some(PartBody {
                            data: Some(URL_SAFE_NO_PAD.encode("<p>html body</p>")),
                        }),
                        ..Default::default()
                    },
                    MessagePart {
                        mime_type: Some("application/pdf".to_string()),
                        filename: Some("invoice.pdf".to_string()),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
        };

        let email = normalize_message(message);
        assert_eq!(email.id, "m1");
        assert_eq!(email.thread_id.as_deref(), Some("t1"));
        assert_eq!(email.subject.as_deref(), Some("Greetings"));
        assert_eq!(email.sender.as_deref(), Some("alice@example.com"));
        assert_eq!(email.recipient.as_deref(), Some("bob@example.com"));
        assert_eq!(email.body_text.as_deref(), Some("plain body"));
        assert_eq!(email.body_html.as_deref(), Some("<p>html body</p>"));
        assert_eq!(email.date_received, Some(1_700_000_000_000));
        assert_eq!(email.date_sent, Some(1_700_000_000_000));
        assert_eq!(email.attachments_count, 1);
        assert!(email.is_read);
        assert!(email.is_starred);
        assert!(!email.is_important);
    }

    #[test]
    fn test_unread_flag_follows_label() {
        let message = GmailMessage {
            id: "m2".to_string(),
            label_ids: Some(vec!["INBOX".to_string(), "UNREAD".to_string()]),
            ..Default::default()
        };

        let email = normalize_message(message);
        assert!(!email.is_read);
        assert!(email.body_text.is_none());
        assert_eq!(email.attachments_count, 0);
    }

    #[test]
    fn test_single_part_body_with_padded_base64() {
        use base64::engine::general_purpose::URL_SAFE;

        let message = GmailMessage {
            id: "m3".to_string(),
            payload: Some(MessagePart {
                mime_type: Some("text/plain".to_string()),
                body: Some(PartBody {
                    data: Some(URL_SAFE.encode("short")),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let email = normalize_message(message);
        assert_eq!(email.body_text.as_deref(), Some("short"));
    }
}
