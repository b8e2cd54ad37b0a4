use rusqlite::{params, OptionalExtension};
use shared_types::{SyncState, SyncStatusView};

use crate::database::AsyncDbConnection;
use anyhow::Result;

/// Create the sync status row for a user, initially `pending`
pub async fn create_sync_status(conn: AsyncDbConnection, user_id: i64) -> Result<i64> {
    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp_millis();

    let id: i64 = conn.query_row(
        "INSERT INTO sync_status (user_id, sync_status, created_at, updated_at)
         VALUES (?, 'pending', ?, ?)
         RETURNING id",
        params![user_id, now, now],
        |row| row.get(0),
    )?;

    Ok(id)
}

/// Create the row lazily if the user has never been synced
pub async fn ensure_sync_status(conn: AsyncDbConnection, user_id: i64) -> Result<()> {
    if get_sync_status(conn.clone(), user_id).await?.is_none() {
        create_sync_status(conn, user_id).await?;
    }
    Ok(())
}

pub async fn get_sync_status(
    conn: AsyncDbConnection,
    user_id: i64,
) -> Result<Option<SyncStatusView>> {
    let conn = conn.lock().await;

    let view = conn
        .query_row(
            "SELECT user_id, sync_status, last_sync, emails_synced, error_message
             FROM sync_status WHERE user_id = ?",
            [user_id],
            |row| {
                let status: String = row.get(1)?;
                Ok(SyncStatusView {
                    user_id: row.get(0)?,
                    status: SyncState::parse(&status),
                    last_sync: row.get(2)?,
                    emails_synced: row.get(3)?,
                    error_message: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(view)
}

/// Targeted patch of a user's sync status.
///
/// `last_sync` is always bumped to now. `emails_synced` is only overwritten
/// when provided. `error_message` is only overwritten when provided; an
/// empty string clears it to NULL, so a completed run must pass `Some("")`
/// explicitly to drop a stale failure message.
pub async fn update_sync_status(
    conn: AsyncDbConnection,
    user_id: i64,
    status: SyncState,
    emails_synced: Option<i64>,
    error_message: Option<&str>,
) -> Result<()> {
    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp_millis();

    conn.execute(
        "UPDATE sync_status SET sync_status = ?, last_sync = ?, updated_at = ?
         WHERE user_id = ?",
        params![status.as_str(), now, now, user_id],
    )?;

    if let Some(count) = emails_synced {
        conn.execute(
            "UPDATE sync_status SET emails_synced = ? WHERE user_id = ?",
            params![count, user_id],
        )?;
    }

    if let Some(message) = error_message {
        let message = (!message.is_empty()).then_some(message);
        conn.execute(
            "UPDATE sync_status SET error_message = ? WHERE user_id = ?",
            params![message, user_id],
        )?;
    }

    Ok(())
}

/// Retention sweep: delete rows whose last sync predates the cutoff.
/// Returns the number of rows removed.
pub async fn delete_stale(conn: AsyncDbConnection, cutoff_millis: i64) -> Result<usize> {
    let conn = conn.lock().await;

    let deleted = conn.execute(
        "DELETE FROM sync_status WHERE last_sync IS NOT NULL AND last_sync < ?",
        [cutoff_millis],
    )?;

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::{seed_user, test_database};

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let user_id = seed_user(&db, "a@example.com", Some("tok")).await;

        assert!(get_sync_status(conn.clone(), user_id).await.unwrap().is_none());

        ensure_sync_status(conn.clone(), user_id).await.unwrap();
        let view = get_sync_status(conn.clone(), user_id).await.unwrap().unwrap();
        assert_eq!(view.status, SyncState::Pending);
        assert_eq!(view.emails_synced, 0);
        assert!(view.last_sync.is_none());

        // ensure is idempotent
        ensure_sync_status(conn.clone(), user_id).await.unwrap();

        update_sync_status(conn.clone(), user_id, SyncState::Running, None, Some(""))
            .await
            .unwrap();
        let view = get_sync_status(conn.clone(), user_id).await.unwrap().unwrap();
        assert_eq!(view.status, SyncState::Running);
        assert!(view.last_sync.is_some());

        update_sync_status(conn.clone(), user_id, SyncState::Completed, Some(42), None)
            .await
            .unwrap();
        let view = get_sync_status(conn.clone(), user_id).await.unwrap().unwrap();
        assert_eq!(view.status, SyncState::Completed);
        assert_eq!(view.emails_synced, 42);

        // failed and completed are both re-enterable
        update_sync_status(conn.clone(), user_id, SyncState::Running, None, Some(""))
            .await
            .unwrap();
        let view = get_sync_status(conn, user_id).await.unwrap().unwrap();
        assert_eq!(view.status, SyncState::Running);
        assert_eq!(view.emails_synced, 42);
    }

    #[tokio::test]
    async fn test_targeted_patch_semantics() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let user_id = seed_user(&db, "a@example.com", Some("tok")).await;
        ensure_sync_status(conn.clone(), user_id).await.unwrap();

        update_sync_status(conn.clone(), user_id, SyncState::Failed, None, Some("boom"))
            .await
            .unwrap();
        let view = get_sync_status(conn.clone(), user_id).await.unwrap().unwrap();
        assert_eq!(view.error_message.as_deref(), Some("boom"));

        // None leaves the stale message in place
        update_sync_status(conn.clone(), user_id, SyncState::Completed, Some(3), None)
            .await
            .unwrap();
        let view = get_sync_status(conn.clone(), user_id).await.unwrap().unwrap();
        assert_eq!(view.error_message.as_deref(), Some("boom"));

        // explicit empty string clears
        update_sync_status(conn.clone(), user_id, SyncState::Completed, None, Some(""))
            .await
            .unwrap();
        let view = get_sync_status(conn, user_id).await.unwrap().unwrap();
        assert!(view.error_message.is_none());
        assert_eq!(view.emails_synced, 3);
    }

    #[tokio::test]
    async fn test_delete_stale_respects_cutoff() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let old_user = seed_user(&db, "old@example.com", Some("tok")).await;
        let fresh_user = seed_user(&db, "fresh@example.com", Some("tok")).await;

        ensure_sync_status(conn.clone(), old_user).await.unwrap();
        ensure_sync_status(conn.clone(), fresh_user).await.unwrap();

        let now = chrono::Utc::now().timestamp_millis();
        let eight_days_ago = now - 8 * 24 * 3600 * 1000;
        {
            let guard = conn.lock().await;
            guard
                .execute(
                    "UPDATE sync_status SET last_sync = ? WHERE user_id = ?",
                    params![eight_days_ago, old_user],
                )
                .unwrap();
            guard
                .execute(
                    "UPDATE sync_status SET last_sync = ? WHERE user_id = ?",
                    params![now, fresh_user],
                )
                .unwrap();
        }

        let cutoff = now - 7 * 24 * 3600 * 1000;
        let deleted = delete_stale(conn.clone(), cutoff).await.unwrap();
        assert_eq!(deleted, 1);

        assert!(get_sync_status(conn.clone(), old_user).await.unwrap().is_none());
        assert!(get_sync_status(conn, fresh_user).await.unwrap().is_some());
    }
}
