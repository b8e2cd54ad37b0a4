//! Idempotent reconciliation of provider records into the local store.
//!
//! Records are keyed by their provider-assigned ids: a record that is
//! already present is never re-created. Stored emails are immutable after
//! create — a re-sync counts an existing record as `updated` without
//! mutating any field, so read/label state captured at first sight is not
//! refreshed. Lookups and inserts run sequentially within a run; the
//! UNIQUE constraints in the schema are the backstop against a concurrent
//! duplicate run.

use crate::database::{emails, labels, AsyncDbConnection};
use crate::integrations::gmail::{NormalizedEmail, ProviderLabel};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailReconcileSummary {
    /// Emails created this run (not a cumulative total)
    pub created: usize,
    /// Emails that already existed and were left untouched
    pub updated: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelReconcileSummary {
    pub created: usize,
    pub total: usize,
}

pub async fn reconcile_emails(
    conn: AsyncDbConnection,
    user_id: i64,
    records: &[NormalizedEmail],
) -> Result<EmailReconcileSummary> {
    let mut created = 0;
    let mut updated = 0;

    for record in records {
        if emails::email_exists(conn.clone(), &record.id).await? {
            updated += 1;
            continue;
        }
        emails::insert_email(conn.clone(), user_id, record).await?;
        created += 1;
    }

    Ok(EmailReconcileSummary {
        created,
        updated,
        total: records.len(),
    })
}

pub async fn reconcile_labels(
    conn: AsyncDbConnection,
    user_id: i64,
    records: &[ProviderLabel],
) -> Result<LabelReconcileSummary> {
    let mut created = 0;

    for record in records {
        if labels::get_label_by_gmail_id(conn.clone(), user_id, &record.id)
            .await?
            .is_some()
        {
            continue;
        }
        labels::insert_label(conn.clone(), user_id, record).await?;
        created += 1;
    }

    Ok(LabelReconcileSummary {
        created,
        total: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::{seed_user, test_database};

    fn record(id: &str) -> NormalizedEmail {
        NormalizedEmail {
            id: id.to_string(),
            subject: Some(format!("Subject {id}")),
            sender: Some("sender@example.com".to_string()),
            ..Default::default()
        }
    }

    fn label(id: &str, name: &str) -> ProviderLabel {
        ProviderLabel {
            id: id.to_string(),
            name: name.to_string(),
            label_type: "user".to_string(),
            messages_total: 10,
            messages_unread: 2,
        }
    }

    #[tokio::test]
    async fn test_reconcile_emails_is_idempotent() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let user_id = seed_user(&db, "a@example.com", Some("tok")).await;

        let records = vec![record("m1"), record("m2")];

        let first = reconcile_emails(conn.clone(), user_id, &records).await.unwrap();
        assert_eq!(first.created, 2);
        assert_eq!(first.updated, 0);
        assert_eq!(first.total, 2);

        let second = reconcile_emails(conn.clone(), user_id, &records).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);

        let count = emails::count_emails(conn, Some(user_id)).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_message_ids_store_one_row() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let user_id = seed_user(&db, "a@example.com", Some("tok")).await;

        let records = vec![record("m1"), record("m1")];

        let summary = reconcile_emails(conn.clone(), user_id, &records).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);

        let count = emails::count_emails(conn, Some(user_id)).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_existing_email_is_not_mutated() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let user_id = seed_user(&db, "a@example.com", Some("tok")).await;

        reconcile_emails(conn.clone(), user_id, &[record("m1")]).await.unwrap();

        let mut changed = record("m1");
        changed.subject = Some("Edited subject".to_string());
        changed.is_read = true;
        reconcile_emails(conn.clone(), user_id, &[changed]).await.unwrap();

        let stored = emails::list_emails(conn, Some(user_id), 10, 0).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].subject.as_deref(), Some("Subject m1"));
        assert!(!stored[0].is_read);
    }

    #[tokio::test]
    async fn test_reconcile_labels_scoped_per_user() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let user_a = seed_user(&db, "a@example.com", Some("tok")).await;
        let user_b = seed_user(&db, "b@example.com", Some("tok")).await;

        let records = vec![label("INBOX", "Inbox"), label("L1", "Receipts")];

        let first = reconcile_labels(conn.clone(), user_a, &records).await.unwrap();
        assert_eq!(first.created, 2);

        // same provider label ids belong independently to another user
        let other = reconcile_labels(conn.clone(), user_b, &records).await.unwrap();
        assert_eq!(other.created, 2);

        let again = reconcile_labels(conn.clone(), user_a, &records).await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.total, 2);

        assert_eq!(labels::list_labels(conn.clone(), user_a).await.unwrap().len(), 2);
        assert_eq!(labels::list_labels(conn, user_b).await.unwrap().len(), 2);
    }
}
