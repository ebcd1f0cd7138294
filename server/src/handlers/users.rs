use actix_web::{delete, get, put, web, HttpResponse};
use common::{parse_id, UserProfile, UserRole};
use serde::{Deserialize, Serialize};

use crate::{
    db::Database,
    error::{ExchangeError, Result},
    session::TokenService,
};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub success: bool,
    pub revoked: u64,
}

#[get("/users/{user_id}")]
pub async fn get_user(path: web::Path<String>, db: web::Data<Database>) -> Result<HttpResponse> {
    let user_id = parse_id(&path)?;
    let user = db
        .users()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ExchangeError::NotFound(format!("user {user_id}")))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user: user.to_profile()?,
    }))
}

#[get("/admin/users")]
pub async fn list_users(db: web::Data<Database>) -> Result<HttpResponse> {
    let users = db
        .users()
        .find_all()
        .await?
        .iter()
        .map(|user| user.to_profile())
        .collect::<Result<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        success: true,
        users,
    }))
}

/// Existing tokens keep the old role snapshot until they are revoked or expire.
#[put("/admin/users/{user_id}/role")]
pub async fn update_user_role(
    path: web::Path<String>,
    req: web::Json<UpdateRoleRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let user_id = parse_id(&path)?;
    let users = db.users();
    users.update_role(user_id, req.role).await?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ExchangeError::NotFound(format!("user {user_id}")))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user: user.to_profile()?,
    }))
}

/// Removes the account and signs it out on every client. Its trades stay in the ledger.
#[delete("/admin/users/{user_id}")]
pub async fn delete_user(
    path: web::Path<String>,
    db: web::Data<Database>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    let user_id = parse_id(&path)?;
    db.users().delete(user_id).await?;
    let revoked = tokens.revoke_user(user_id).await?;

    Ok(HttpResponse::Ok().json(RevokeResponse {
        success: true,
        revoked,
    }))
}

#[delete("/admin/users/{user_id}/tokens")]
pub async fn revoke_user_tokens(
    path: web::Path<String>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    let user_id = parse_id(&path)?;
    let revoked = tokens.revoke_user(user_id).await?;

    Ok(HttpResponse::Ok().json(RevokeResponse {
        success: true,
        revoked,
    }))
}
