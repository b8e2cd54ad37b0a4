use rusqlite::{params, OptionalExtension, Row};
use shared_types::Label;

use crate::database::AsyncDbConnection;
use crate::integrations::gmail::ProviderLabel;
use anyhow::Result;

const LABEL_COLUMNS: &str = "id, user_id, gmail_label_id, name, label_type, messages_total, \
     messages_unread, created_at, updated_at";

fn map_label(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        user_id: row.get(1)?,
        gmail_label_id: row.get(2)?,
        name: row.get(3)?,
        label_type: row.get(4)?,
        messages_total: row.get(5)?,
        messages_unread: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert a label snapshot for a user and return the new row id
pub async fn insert_label(
    conn: AsyncDbConnection,
    user_id: i64,
    record: &ProviderLabel,
) -> Result<i64> {
    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp_millis();

    let label_id: i64 = conn.query_row(
        "INSERT INTO labels
         (user_id, gmail_label_id, name, label_type, messages_total, messages_unread, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
        params![
            user_id,
            record.id,
            record.name,
            record.label_type,
            record.messages_total,
            record.messages_unread,
            now,
            now
        ],
        |row| row.get(0),
    )?;

    Ok(label_id)
}

pub async fn get_label_by_gmail_id(
    conn: AsyncDbConnection,
    user_id: i64,
    gmail_label_id: &str,
) -> Result<Option<Label>> {
    let conn = conn.lock().await;

    let label = conn
        .query_row(
            &format!(
                "SELECT {LABEL_COLUMNS} FROM labels
                 WHERE user_id = ? AND gmail_label_id = ?"
            ),
            params![user_id, gmail_label_id],
            map_label,
        )
        .optional()?;

    Ok(label)
}

pub async fn list_labels(conn: AsyncDbConnection, user_id: i64) -> Result<Vec<Label>> {
    let conn = conn.lock().await;

    let mut stmt = conn.prepare(&format!(
        "SELECT {LABEL_COLUMNS} FROM labels
         WHERE user_id = ?
         ORDER BY label_type, name"
    ))?;

    let labels = stmt
        .query_map([user_id], map_label)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(labels)
}

/// Labels attached to a cached email through the association table.
/// The batch sync path does not populate it yet; this is the read side.
pub async fn get_labels_for_email(conn: AsyncDbConnection, email_id: i64) -> Result<Vec<Label>> {
    let conn = conn.lock().await;

    let mut stmt = conn.prepare(
        "SELECT l.id, l.user_id, l.gmail_label_id, l.name, l.label_type, l.messages_total,
                l.messages_unread, l.created_at, l.updated_at
         FROM labels l
         INNER JOIN email_labels el ON l.id = el.label_id
         WHERE el.email_id = ?
         ORDER BY l.name",
    )?;

    let labels = stmt
        .query_map([email_id], map_label)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(labels)
}
