use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    // Create users table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email VARCHAR NOT NULL UNIQUE,
            gmail_user_id VARCHAR UNIQUE,
            access_token VARCHAR,
            refresh_token VARCHAR,
            token_expiry BIGINT,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_active
            ON users(is_active)",
        [],
    )?;

    // Create labels table. The (user_id, gmail_label_id) uniqueness is the
    // storage-level guard against concurrent duplicate reconciliation.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            gmail_label_id VARCHAR NOT NULL,
            name VARCHAR NOT NULL,
            label_type VARCHAR NOT NULL DEFAULT 'user',
            messages_total INTEGER NOT NULL DEFAULT 0,
            messages_unread INTEGER NOT NULL DEFAULT 0,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id),
            UNIQUE (user_id, gmail_label_id)
        )",
        [],
    )?;

    // Create emails table. gmail_message_id is globally unique: the
    // provider id already embeds the account scope.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS emails (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            gmail_message_id VARCHAR NOT NULL UNIQUE,
            thread_id VARCHAR,
            subject VARCHAR,
            sender VARCHAR,
            recipient VARCHAR,
            cc VARCHAR,
            bcc VARCHAR,
            date_sent BIGINT,
            date_received BIGINT,
            body_text VARCHAR,
            body_html VARCHAR,
            snippet VARCHAR,
            is_read BOOLEAN NOT NULL DEFAULT false,
            is_important BOOLEAN NOT NULL DEFAULT false,
            is_starred BOOLEAN NOT NULL DEFAULT false,
            raw_headers VARCHAR,
            attachments_count INTEGER NOT NULL DEFAULT 0,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_emails_thread
            ON emails(thread_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_emails_user_received
            ON emails(user_id, date_received)",
        [],
    )?;

    // Reserved many-to-many association between emails and labels
    conn.execute(
        "CREATE TABLE IF NOT EXISTS email_labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email_id INTEGER NOT NULL,
            label_id INTEGER NOT NULL,
            created_at BIGINT NOT NULL,
            FOREIGN KEY (email_id) REFERENCES emails (id),
            FOREIGN KEY (label_id) REFERENCES labels (id),
            UNIQUE (email_id, label_id)
        )",
        [],
    )?;

    // Attachment metadata; content storage happens elsewhere
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email_id INTEGER NOT NULL,
            filename VARCHAR NOT NULL,
            content_type VARCHAR,
            size_bytes INTEGER,
            gmail_attachment_id VARCHAR,
            file_path VARCHAR,
            created_at BIGINT NOT NULL,
            FOREIGN KEY (email_id) REFERENCES emails (id)
        )",
        [],
    )?;

    // Create sync_status table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sync_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            sync_status VARCHAR NOT NULL DEFAULT 'pending' CHECK (sync_status IN ('pending', 'running', 'completed', 'failed')),
            last_sync BIGINT,
            last_history_id VARCHAR,
            emails_synced INTEGER NOT NULL DEFAULT 0,
            error_message VARCHAR,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_status_user
            ON sync_status(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_status_last_sync
            ON sync_status(last_sync)",
        [],
    )?;

    Ok(())
}
