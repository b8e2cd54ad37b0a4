use rusqlite::{params, OptionalExtension, Row};
use shared_types::User;

use crate::database::AsyncDbConnection;
use anyhow::Result;

const USER_COLUMNS: &str = "id, email, gmail_user_id, access_token, refresh_token, token_expiry, \
     is_active, created_at, updated_at";

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        gmail_user_id: row.get(2)?,
        access_token: row.get(3)?,
        refresh_token: row.get(4)?,
        token_expiry: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert a new user row and return its id
pub async fn create_user(
    conn: AsyncDbConnection,
    email: &str,
    gmail_user_id: Option<&str>,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    token_expiry: Option<i64>,
) -> Result<i64> {
    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp_millis();

    let user_id: i64 = conn.query_row(
        "INSERT INTO users
         (email, gmail_user_id, access_token, refresh_token, token_expiry, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, true, ?, ?)
         RETURNING id",
        params![email, gmail_user_id, access_token, refresh_token, token_expiry, now, now],
        |row| row.get(0),
    )?;

    Ok(user_id)
}

pub async fn get_user(conn: AsyncDbConnection, user_id: i64) -> Result<Option<User>> {
    let conn = conn.lock().await;

    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            [user_id],
            map_user,
        )
        .optional()?;

    Ok(user)
}

pub async fn get_user_by_email(conn: AsyncDbConnection, email: &str) -> Result<Option<User>> {
    let conn = conn.lock().await;

    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
            [email],
            map_user,
        )
        .optional()?;

    Ok(user)
}

pub async fn list_users(conn: AsyncDbConnection) -> Result<Vec<User>> {
    let conn = conn.lock().await;

    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
    let users = stmt
        .query_map([], map_user)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

/// Users eligible for a scheduled sync: active with a stored access token
pub async fn list_active_users_with_tokens(conn: AsyncDbConnection) -> Result<Vec<User>> {
    let conn = conn.lock().await;

    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE is_active = true AND access_token IS NOT NULL
         ORDER BY id"
    ))?;
    let users = stmt
        .query_map([], map_user)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

/// Overwrite the stored OAuth token triple
pub async fn update_tokens(
    conn: AsyncDbConnection,
    user_id: i64,
    access_token: &str,
    refresh_token: Option<&str>,
    token_expiry: Option<i64>,
) -> Result<()> {
    let conn = conn.lock().await;
    let now = chrono::Utc::now().timestamp_millis();

    conn.execute(
        "UPDATE users SET access_token = ?, refresh_token = ?, token_expiry = ?, updated_at = ?
         WHERE id = ?",
        params![access_token, refresh_token, token_expiry, now, user_id],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::test_database;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let id = create_user(conn.clone(), "a@example.com", Some("g-1"), Some("tok"), None, None)
            .await
            .unwrap();

        let user = get_user(conn.clone(), id).await.unwrap().unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.gmail_user_id.as_deref(), Some("g-1"));
        assert!(user.is_active);

        let by_email = get_user_by_email(conn.clone(), "a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, id);

        assert!(get_user(conn, id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_tokens() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let id = create_user(conn.clone(), "a@example.com", None, Some("old"), None, None)
            .await
            .unwrap();

        update_tokens(conn.clone(), id, "new", Some("refresh"), Some(123))
            .await
            .unwrap();

        let user = get_user(conn, id).await.unwrap().unwrap();
        assert_eq!(user.access_token.as_deref(), Some("new"));
        assert_eq!(user.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(user.token_expiry, Some(123));
    }

    #[tokio::test]
    async fn test_list_active_users_with_tokens_filters() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let with_token = create_user(conn.clone(), "a@example.com", None, Some("tok"), None, None)
            .await
            .unwrap();
        create_user(conn.clone(), "b@example.com", None, None, None, None)
            .await
            .unwrap();
        let inactive = create_user(conn.clone(), "c@example.com", None, Some("tok"), None, None)
            .await
            .unwrap();

        {
            let guard = conn.lock().await;
            guard
                .execute("UPDATE users SET is_active = false WHERE id = ?", [inactive])
                .unwrap();
        }

        let eligible = list_active_users_with_tokens(conn).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, with_token);
    }
}
