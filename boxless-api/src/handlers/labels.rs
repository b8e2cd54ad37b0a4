use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::ListLabelsResponse;
use std::sync::Arc;

use crate::database::Database;
use crate::database::{labels as labels_db, users as users_db};

pub async fn list_labels(
    db: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let conn = db.async_connection.clone();

    users_db::get_user(conn.clone(), user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .ok_or_else(|| actix_web::error::ErrorNotFound(format!("User {user_id} not found")))?;

    let labels = labels_db::list_labels(conn, user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ListLabelsResponse { labels }))
}
