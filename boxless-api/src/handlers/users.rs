use actix_web::{web, HttpResponse, Result as ActixResult};
use shared_types::{CreateUserRequest, UsersResponse};
use std::sync::Arc;

use crate::database::users as users_db;
use crate::database::Database;
use crate::integrations::gmail::{GmailCredentials, MailProviderFactory};

/// Register a user from an OAuth token triple.
///
/// The account email comes from the provider profile, which also proves the
/// access token works before anything is stored. Registering an existing
/// account refreshes its tokens instead of failing.
pub async fn create_user(
    db: web::Data<Arc<Database>>,
    factory: web::Data<Arc<dyn MailProviderFactory>>,
    request: web::Json<CreateUserRequest>,
) -> ActixResult<HttpResponse> {
    let request = request.into_inner();

    let provider = factory.create(GmailCredentials {
        access_token: request.access_token.clone(),
        refresh_token: request.refresh_token.clone(),
        token_expiry: request.token_expiry,
    });

    let profile = provider.get_profile().await.map_err(|e| {
        actix_web::error::ErrorBadRequest(format!("Could not fetch Gmail profile: {e}"))
    })?;

    let conn = db.async_connection.clone();
    let existing = users_db::get_user_by_email(conn.clone(), &profile.email_address)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    let (user_id, created) = match existing {
        Some(user) => {
            users_db::update_tokens(
                conn.clone(),
                user.id,
                &request.access_token,
                request.refresh_token.as_deref(),
                request.token_expiry,
            )
            .await
            .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;
            (user.id, false)
        }
        None => {
            let user_id = users_db::create_user(
                conn.clone(),
                &profile.email_address,
                Some(&profile.email_address),
                Some(&request.access_token),
                request.refresh_token.as_deref(),
                request.token_expiry,
            )
            .await
            .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;
            (user_id, true)
        }
    };

    let user = users_db::get_user(conn, user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("User row vanished"))?;

    if created {
        Ok(HttpResponse::Created().json(user))
    } else {
        Ok(HttpResponse::Ok().json(user))
    }
}

pub async fn list_users(db: web::Data<Arc<Database>>) -> ActixResult<HttpResponse> {
    let users = users_db::list_users(db.async_connection.clone())
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    let total_count = users.len() as i64;

    Ok(HttpResponse::Ok().json(UsersResponse { users, total_count }))
}

pub async fn get_user(
    db: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();

    let user = users_db::get_user(db.async_connection.clone(), user_id)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?
        .ok_or_else(|| actix_web::error::ErrorNotFound(format!("User {user_id} not found")))?;

    Ok(HttpResponse::Ok().json(user))
}
