use rusqlite::{params, OptionalExtension, Row};
use shared_types::Email;

use crate::database::AsyncDbConnection;
use crate::integrations::gmail::NormalizedEmail;
use anyhow::Result;

const EMAIL_COLUMNS: &str = "id, user_id, gmail_message_id, thread_id, subject, sender, recipient, cc, bcc, \
     date_sent, date_received, body_text, body_html, snippet, is_read, is_important, \
     is_starred, raw_headers, attachments_count, created_at, updated_at";

fn map_email(row: &Row) -> rusqlite::Result<Email> {
    let raw_headers: Option<String> = row.get(17)?;

    Ok(Email {
        id: row.get(0)?,
        user_id: row.get(1)?,
        gmail_message_id: row.get(2)?,
        thread_id: row.get(3)?,
        subject: row.get(4)?,
        sender: row.get(5)?,
        recipient: row.get(6)?,
        cc: row.get(7)?,
        bcc: row.get(8)?,
        date_sent: row.get(9)?,
        date_received: row.get(10)?,
        body_text: row.get(11)?,
        body_html: row.get(12)?,
        snippet: row.get(13)?,
        is_read: row.get(14)?,
        is_important: row.get(15)?,
        is_starred: row.get(16)?,
        raw_headers: raw_headers.and_then(|json| serde_json::from_str(&json).ok()),
        attachments_count: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

/// Insert a provider message into the cache and return the new row id.
///
/// The UNIQUE constraint on gmail_message_id rejects duplicates that slip
/// past the reconciler's existence check.
pub async fn insert_email(
    conn: AsyncDbConnection,
    user_id: i64,
    record: &NormalizedEmail,
) -> Result<i64> {
    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp_millis();

    let headers_json = record
        .headers
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let email_id: i64 = conn.query_row(
        "INSERT INTO emails
         (user_id, gmail_message_id, thread_id, subject, sender, recipient, cc, bcc,
          date_sent, date_received, body_text, body_html, snippet, is_read, is_important,
          is_starred, raw_headers, attachments_count, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
        params![
            user_id,
            record.id,
            record.thread_id,
            record.subject,
            record.sender,
            record.recipient,
            record.cc,
            record.bcc,
            record.date_sent,
            record.date_received,
            record.body_text,
            record.body_html,
            record.snippet,
            record.is_read,
            record.is_important,
            record.is_starred,
            headers_json,
            record.attachments_count,
            now,
            now
        ],
        |row| row.get(0),
    )?;

    Ok(email_id)
}

pub async fn email_exists(conn: AsyncDbConnection, gmail_message_id: &str) -> Result<bool> {
    let conn = conn.lock().await;

    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM emails WHERE gmail_message_id = ?",
            [gmail_message_id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(id.is_some())
}

/// Get email by ID
pub async fn get_email(conn: AsyncDbConnection, email_id: i64) -> Result<Option<Email>> {
    let conn = conn.lock().await;

    let email = conn
        .query_row(
            &format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ?"),
            [email_id],
            map_email,
        )
        .optional()?;

    Ok(email)
}

/// List emails with pagination, newest first
pub async fn list_emails(
    conn: AsyncDbConnection,
    user_id: Option<i64>,
    limit: usize,
    offset: usize,
) -> Result<Vec<Email>> {
    let conn = conn.lock().await;

    let emails = match user_id {
        Some(user_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EMAIL_COLUMNS} FROM emails WHERE user_id = ?
                 ORDER BY date_received DESC LIMIT ? OFFSET ?"
            ))?;
            let rows = stmt
                .query_map(params![user_id, limit as i64, offset as i64], map_email)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EMAIL_COLUMNS} FROM emails
                 ORDER BY date_received DESC LIMIT ? OFFSET ?"
            ))?;
            let rows = stmt
                .query_map(params![limit as i64, offset as i64], map_email)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(emails)
}

pub async fn count_emails(conn: AsyncDbConnection, user_id: Option<i64>) -> Result<i64> {
    let conn = conn.lock().await;

    let count: i64 = match user_id {
        Some(user_id) => conn.query_row(
            "SELECT COUNT(*) FROM emails WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))?,
    };

    Ok(count)
}
