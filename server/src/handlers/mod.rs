pub mod auth;
pub mod health;
pub mod items;
pub mod trades;
pub mod users;

pub use auth::{login, logout, register};
pub use health::health_check;
pub use items::{create_item, delete_item, get_item, list_items};
pub use trades::{
    create_trade, delete_trade, get_trade, list_trades, trades_by_item, trades_by_user,
    update_trade,
};
pub use users::{delete_user, get_user, list_users, revoke_user_tokens, update_user_role};

use actix_web::{middleware::from_fn, web};

use crate::middleware::auth_middleware;

/// Full route table: public routes plus the token-guarded `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(public_routes).service(
        web::scope("/api")
            .wrap(from_fn(auth_middleware))
            .configure(protected_routes),
    );
}

/// Routes reachable without a token.
pub fn public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check).service(register).service(login);
}

/// Routes mounted under the authenticated `/api` scope.
pub fn protected_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(logout)
        .service(list_trades)
        .service(create_trade)
        .service(get_trade)
        .service(update_trade)
        .service(delete_trade)
        .service(list_items)
        .service(get_item)
        .service(trades_by_item)
        .service(get_user)
        .service(trades_by_user)
        .service(create_item)
        .service(delete_item)
        .service(list_users)
        .service(update_user_role)
        .service(delete_user)
        .service(revoke_user_tokens);
}
