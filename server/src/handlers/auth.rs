use actix_web::{http::header::USER_AGENT, post, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use common::{UserProfile, UserRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{Database, UserRecord},
    error::{ExchangeError, Result},
    middleware::AuthenticatedUser,
    session::TokenService,
};

const MIN_PASSWORD_LEN: usize = 8;
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(ExchangeError::Validation("username is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(ExchangeError::Validation("email is not valid".to_string()));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ExchangeError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[post("/auth/register")]
pub async fn register(
    req: web::Json<RegisterRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    req.validate()?;

    let req = req.into_inner();
    let user = UserRecord::new(req.username, req.email, &req.password, UserRole::User)?;
    db.users().create(&user).await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        success: true,
        user: user.to_profile()?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Client fingerprint used to key the stored token row.
pub fn client_fingerprint(req: &HttpRequest) -> String {
    req.headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[post("/auth/login")]
pub async fn login(
    http_req: HttpRequest,
    req: web::Json<LoginRequest>,
    db: web::Data<Database>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    log::info!("Login attempt for: {}", req.email);

    let user = db
        .users()
        .find_by_email(&req.email)
        .await?
        .ok_or(ExchangeError::InvalidCredentials)?;

    if !user.verify_password(&req.password)? {
        log::warn!("Failed login attempt for: {}", req.email);
        return Err(ExchangeError::InvalidCredentials);
    }

    let issued = tokens
        .issue(user.id, user.role()?, &client_fingerprint(&http_req))
        .await?;

    log::info!("Successful login for user {}", user.id);

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        user_id: issued.user_id,
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub revoked: u64,
}

#[post("/auth/logout")]
pub async fn logout(
    caller: web::ReqData<AuthenticatedUser>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse> {
    let revoked = tokens
        .revoke_fingerprint(caller.user_id, &caller.user_agent)
        .await?;

    Ok(HttpResponse::Ok().json(LogoutResponse {
        success: true,
        revoked,
    }))
}
