//! Background mailbox synchronization.
//!
//! `SyncManager` owns the whole sync path: orchestrating one user's run
//! (status transitions, label + paged email reconciliation, pacing) and
//! dispatching runs across all eligible users, either inline or through a
//! durable task queue with staggered delays.

use crate::database::{reconcile, sync_status as sync_db, users as users_db, AsyncDbConnection};
use crate::integrations::gmail::{GmailCredentials, MailProviderFactory};
use crate::jobs::task_queue::TaskBackend;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use shared_types::{SyncResult, SyncState, SyncUserRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for the sync engine, lifted from configuration
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: usize,
    pub max_messages_per_run: usize,
    pub recency_days: u32,
    pub page_delay: Duration,
    pub stagger_secs: i64,
    pub status_retention_days: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_messages_per_run: 1000,
            recency_days: 30,
            page_delay: Duration::from_secs(1),
            stagger_secs: 30,
            status_retention_days: 7,
        }
    }
}

/// Durable dispatch target, present only when a queue is configured
pub struct QueueDispatch {
    backend: Arc<dyn TaskBackend>,
    sync_task_url: String,
}

impl QueueDispatch {
    pub fn new(backend: Arc<dyn TaskBackend>, sync_task_url: impl Into<String>) -> Self {
        Self {
            backend,
            sync_task_url: sync_task_url.into(),
        }
    }
}

pub struct SyncManager {
    db_conn: AsyncDbConnection,
    provider_factory: Arc<dyn MailProviderFactory>,
    /// Resolved once at construction: None means inline mode
    queue: Option<QueueDispatch>,
    settings: SyncSettings,
    shutting_down: AtomicBool,
}

impl SyncManager {
    pub fn new(
        db_conn: AsyncDbConnection,
        provider_factory: Arc<dyn MailProviderFactory>,
        queue: Option<QueueDispatch>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            db_conn,
            provider_factory,
            queue,
            settings,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
    }

    /// Schedule a sync for one user. Without a queue the sync runs
    /// immediately in-process.
    pub async fn schedule_user_sync(&self, user_id: i64, delay_seconds: i64) -> Result<()> {
        let not_before =
            (delay_seconds > 0).then(|| Utc::now() + ChronoDuration::seconds(delay_seconds));
        self.schedule_user_sync_at(user_id, not_before).await
    }

    async fn schedule_user_sync_at(
        &self,
        user_id: i64,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let Some(queue) = &self.queue else {
            // Local development: run the sync inline
            self.sync_user_emails(user_id).await;
            return Ok(());
        };

        let payload = serde_json::to_vec(&SyncUserRequest { user_id })?;
        let task = queue
            .backend
            .enqueue(&queue.sync_task_url, payload, not_before)
            .await?;

        tracing::info!("Scheduled sync task for user {}: {}", user_id, task);
        Ok(())
    }

    /// Run one user's sync to completion.
    ///
    /// Never returns an error: any failure is recorded on the sync status
    /// row and reported inside the result, so callers branch on `status`
    /// instead of catching.
    pub async fn sync_user_emails(&self, user_id: i64) -> SyncResult {
        match self.run_user_sync(user_id).await {
            Ok(result) => result,
            Err(e) => {
                let error_msg = e.to_string();
                tracing::error!("Sync failed for user {}: {}", user_id, error_msg);

                if let Err(status_err) = sync_db::update_sync_status(
                    self.db_conn.clone(),
                    user_id,
                    SyncState::Failed,
                    None,
                    Some(&error_msg),
                )
                .await
                {
                    // The log is the fallback sink when even the status
                    // write fails
                    tracing::error!(
                        "Could not record failed sync for user {}: {} (original error: {})",
                        user_id,
                        status_err,
                        error_msg
                    );
                }

                SyncResult {
                    user_id,
                    status: SyncState::Failed,
                    emails_synced: 0,
                    labels_synced: 0,
                    error: Some(error_msg),
                }
            }
        }
    }

    async fn run_user_sync(&self, user_id: i64) -> Result<SyncResult> {
        let user = users_db::get_user(self.db_conn.clone(), user_id)
            .await?
            .ok_or_else(|| anyhow!("User {} not found", user_id))?;

        sync_db::ensure_sync_status(self.db_conn.clone(), user_id).await?;
        // The empty string clears any error left by a previous failed run
        sync_db::update_sync_status(
            self.db_conn.clone(),
            user_id,
            SyncState::Running,
            None,
            Some(""),
        )
        .await?;

        let access_token = user
            .access_token
            .clone()
            .ok_or_else(|| anyhow!("User {} has no access token", user_id))?;

        // Fresh credentials per run; validated lazily by the first request
        let provider = self.provider_factory.create(GmailCredentials {
            access_token,
            refresh_token: user.refresh_token.clone(),
            token_expiry: user.token_expiry,
        });

        let provider_labels = provider.list_labels().await?;
        let label_summary =
            reconcile::reconcile_labels(self.db_conn.clone(), user_id, &provider_labels).await?;

        let query = format!("newer_than:{}d", self.settings.recency_days);
        let mut total_synced: i64 = 0;
        let mut fetched = 0usize;
        let mut page_token: Option<String> = None;

        while fetched < self.settings.max_messages_per_run {
            let page_size = self
                .settings
                .page_size
                .min(self.settings.max_messages_per_run - fetched);

            // A failing page truncates the run but keeps the progress made
            // so far; the run still completes with a partial count.
            let page = match provider
                .list_messages(Some(&query), page_size, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!("Error syncing batch for user {}: {}", user_id, e);
                    break;
                }
            };

            if page.emails.is_empty() {
                break;
            }
            fetched += page.emails.len();

            match reconcile::reconcile_emails(self.db_conn.clone(), user_id, &page.emails).await {
                Ok(summary) => total_synced += summary.created as i64,
                Err(e) => {
                    tracing::error!("Error syncing batch for user {}: {}", user_id, e);
                    break;
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }

            // Pace requests to the provider between pages
            tokio::time::sleep(self.settings.page_delay).await;
        }

        sync_db::update_sync_status(
            self.db_conn.clone(),
            user_id,
            SyncState::Completed,
            Some(total_synced),
            None,
        )
        .await?;

        tracing::info!("Completed sync for user {}: {} emails", user_id, total_synced);

        Ok(SyncResult {
            user_id,
            status: SyncState::Completed,
            emails_synced: total_synced,
            labels_synced: label_summary.created as i64,
            error: None,
        })
    }

    /// Dispatch a sync for every active, credentialed user, staggered by
    /// the configured stride so sync starts spread out over time.
    /// Returns the number of users scheduled.
    pub async fn sync_all_active_users(&self) -> Result<usize> {
        let users = users_db::list_active_users_with_tokens(self.db_conn.clone()).await?;
        tracing::info!("Starting background sync for {} users", users.len());

        let base = Utc::now();
        let mut scheduled = 0;

        for (i, user) in users.iter().enumerate() {
            let not_before = (i > 0)
                .then(|| base + ChronoDuration::seconds(i as i64 * self.settings.stagger_secs));

            // One user's enqueue failure must not block the rest
            match self.schedule_user_sync_at(user.id, not_before).await {
                Ok(()) => scheduled += 1,
                Err(e) => tracing::error!("Failed to schedule sync for user {}: {}", user.id, e),
            }
        }

        Ok(scheduled)
    }

    /// Purge sync status rows whose last run is older than `days`
    pub async fn cleanup_old_sync_statuses(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let deleted =
            sync_db::delete_stale(self.db_conn.clone(), cutoff.timestamp_millis()).await?;

        if deleted > 0 {
            tracing::info!("Purged {} stale sync status rows", deleted);
        }
        Ok(deleted)
    }
}
