use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::{SyncAllResponse, SyncState, SyncStatusView, SyncUserRequest};
use std::sync::Arc;

use crate::database::{sync_status as sync_db, users as users_db};
use crate::database::Database;
use crate::jobs::sync_manager::SyncManager;

/// Task callback: run one user's sync.
///
/// Always answers 200 so the queue does not redeliver; failures are carried
/// inside the result and on the user's sync status row.
pub async fn sync_user_task(
    manager: web::Data<Arc<SyncManager>>,
    request: web::Json<SyncUserRequest>,
) -> ActixResult<HttpResponse> {
    let result = manager.sync_user_emails(request.user_id).await;
    Ok(HttpResponse::Ok().json(result))
}

/// Manual trigger for the sync-all dispatch, same path the periodic loop
/// takes.
pub async fn sync_all_users(
    manager: web::Data<Arc<SyncManager>>,
) -> ActixResult<HttpResponse> {
    let scheduled = manager
        .sync_all_active_users()
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok().json(SyncAllResponse { scheduled }))
}

pub async fn get_sync_status(
    db: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let conn = db.async_connection.clone();

    users_db::get_user(conn.clone(), user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .ok_or_else(|| actix_web::error::ErrorNotFound(format!("User {user_id} not found")))?;

    let view = sync_db::get_sync_status(conn, user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .unwrap_or(SyncStatusView {
            user_id,
            status: SyncState::NeverSynced,
            last_sync: None,
            emails_synced: 0,
            error_message: None,
        });

    Ok(HttpResponse::Ok().json(view))
}
