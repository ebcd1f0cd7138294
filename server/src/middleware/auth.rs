use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderValue, AUTHORIZATION},
    middleware::Next,
    web, HttpMessage,
};
use common::UserRole;
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::session::TokenService;

/// Identity attached to every admitted request, available to handlers as
/// `web::ReqData<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub user_agent: String,
}

impl AuthenticatedUser {
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.role.is_admin() || self.user_id == owner_id
    }
}

/// Role-based route gate: paths under an admin prefix need the `admin` role.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    admin_prefixes: Vec<String>,
}

impl AccessPolicy {
    pub fn new(admin_prefixes: Vec<String>) -> Self {
        Self { admin_prefixes }
    }

    pub fn requires_admin(&self, path: &str) -> bool {
        self.admin_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn authorize(&self, path: &str, role: &str) -> Result<UserRole, ExchangeError> {
        match role.parse::<UserRole>() {
            Ok(UserRole::Admin) => Ok(UserRole::Admin),
            Ok(UserRole::User) if self.requires_admin(path) => Err(ExchangeError::Forbidden(
                "admin role required".to_string(),
            )),
            Ok(UserRole::User) => Ok(UserRole::User),
            Err(_) => Err(ExchangeError::Forbidden(format!("role '{role}' is not permitted"))),
        }
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` header.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, ExchangeError> {
    let raw = header
        .ok_or(ExchangeError::MissingCredential)?
        .to_str()
        .map_err(|_| ExchangeError::MalformedCredential)?;
    if raw.is_empty() {
        return Err(ExchangeError::MissingCredential);
    }

    let mut parts = raw.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(ExchangeError::MalformedCredential),
    }
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let token = bearer_token(req.headers().get(AUTHORIZATION))?;

    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .ok_or_else(|| ExchangeError::Internal("Token service not available".to_string()))?;

    let claims = tokens.validate(token).map_err(|err| {
        log::debug!("Rejected token on {}: {}", req.path(), err);
        ExchangeError::InvalidToken(err)
    })?;

    let policy = req
        .app_data::<web::Data<AccessPolicy>>()
        .ok_or_else(|| ExchangeError::Internal("Access policy not available".to_string()))?;

    // the router matches on the requoted path, so the gate must see the same one
    let routed_path = req.match_info().get_ref().path();
    let role = policy.authorize(routed_path, &claims.role).map_err(|err| {
        log::warn!(
            "User {} ({}) denied access to {}",
            claims.user_id,
            claims.role,
            routed_path
        );
        err
    })?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.user_id,
        role,
        user_agent: claims.user_agent,
    });

    next.call(req).await
}
