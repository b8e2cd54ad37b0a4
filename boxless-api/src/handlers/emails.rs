use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::{GetEmailLabelsResponse, ListEmailsRequest, ListEmailsResponse};
use std::sync::Arc;

use crate::database::Database;
use crate::database::{emails as emails_db, labels as labels_db};

pub async fn list_emails(
    db: web::Data<Arc<Database>>,
    query: web::Query<ListEmailsRequest>,
) -> ActixResult<HttpResponse> {
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);

    let conn = db.async_connection.clone();
    let emails = emails_db::list_emails(conn.clone(), query.user_id, limit, offset)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    let total_count = emails_db::count_emails(conn, query.user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    let has_more = (offset + emails.len()) < total_count as usize;

    Ok(HttpResponse::Ok().json(ListEmailsResponse {
        emails,
        total_count,
        has_more,
    }))
}

pub async fn get_email(
    db: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let email_id = path.into_inner();

    let email = emails_db::get_email(db.async_connection.clone(), email_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .ok_or_else(|| actix_web::error::ErrorNotFound(format!("Email {email_id} not found")))?;

    Ok(HttpResponse::Ok().json(email))
}

pub async fn get_email_labels(
    db: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let email_id = path.into_inner();
    let conn = db.async_connection.clone();

    emails_db::get_email(conn.clone(), email_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .ok_or_else(|| actix_web::error::ErrorNotFound(format!("Email {email_id} not found")))?;

    let labels = labels_db::get_labels_for_email(conn, email_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok().json(GetEmailLabelsResponse { email_id, labels }))
}
