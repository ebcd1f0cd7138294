use actix_web::{delete, get, post, put, web, HttpResponse};
use common::{parse_id, parse_ids, validate_item_sets, Trade};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::Database,
    error::{ExchangeError, Result},
    middleware::AuthenticatedUser,
};

#[derive(Debug, Deserialize)]
pub struct TradeItemsRequest {
    #[serde(default)]
    pub offered_items: Vec<String>,
    #[serde(default)]
    pub requested_items: Vec<String>,
}

impl TradeItemsRequest {
    /// Parses both sets and checks them against each other and the catalog.
    async fn resolve(&self, db: &Database) -> Result<(Vec<Uuid>, Vec<Uuid>)> {
        let offered = parse_ids(&self.offered_items)?;
        let requested = parse_ids(&self.requested_items)?;
        if offered.is_empty() && requested.is_empty() {
            return Err(ExchangeError::Validation(
                "a trade needs at least one item".to_string(),
            ));
        }
        validate_item_sets(&offered, &requested)?;

        let all: Vec<Uuid> = offered.iter().chain(requested.iter()).copied().collect();
        if let Some(missing) = db.items().missing(&all).await?.first() {
            return Err(ExchangeError::NotFound(format!("item {missing}")));
        }

        Ok((offered, requested))
    }
}

#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub success: bool,
    pub trade: Trade,
}

#[derive(Debug, Serialize)]
pub struct TradeListResponse {
    pub success: bool,
    pub trades: Vec<Trade>,
}

impl From<Vec<Trade>> for TradeListResponse {
    fn from(trades: Vec<Trade>) -> Self {
        Self {
            success: true,
            trades,
        }
    }
}

#[get("/trades")]
pub async fn list_trades(db: web::Data<Database>) -> Result<HttpResponse> {
    let trades = db.trades().find_all().await?;
    Ok(HttpResponse::Ok().json(TradeListResponse::from(trades)))
}

#[post("/trades")]
pub async fn create_trade(
    req: web::Json<TradeItemsRequest>,
    caller: web::ReqData<AuthenticatedUser>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let (offered, requested) = req.resolve(&db).await?;

    let ledger = db.trades();
    let trade_id = ledger.create(caller.user_id, &offered, &requested).await?;
    let trade = ledger.find_by_id(trade_id).await?;

    Ok(HttpResponse::Created().json(TradeResponse {
        success: true,
        trade,
    }))
}

#[get("/trades/{trade_id}")]
pub async fn get_trade(path: web::Path<String>, db: web::Data<Database>) -> Result<HttpResponse> {
    let trade_id = parse_id(&path)?;
    let trade = db.trades().find_by_id(trade_id).await?;

    Ok(HttpResponse::Ok().json(TradeResponse {
        success: true,
        trade,
    }))
}

#[put("/trades/{trade_id}")]
pub async fn update_trade(
    path: web::Path<String>,
    req: web::Json<TradeItemsRequest>,
    caller: web::ReqData<AuthenticatedUser>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let trade_id = parse_id(&path)?;
    let ledger = db.trades();

    let existing = ledger.find_by_id(trade_id).await?;
    ensure_can_manage(&caller, &existing)?;

    let (offered, requested) = req.resolve(&db).await?;
    ledger.update(trade_id, &offered, &requested).await?;
    let trade = ledger.find_by_id(trade_id).await?;

    Ok(HttpResponse::Ok().json(TradeResponse {
        success: true,
        trade,
    }))
}

#[delete("/trades/{trade_id}")]
pub async fn delete_trade(
    path: web::Path<String>,
    caller: web::ReqData<AuthenticatedUser>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let trade_id = parse_id(&path)?;
    let ledger = db.trades();

    let existing = ledger.find_by_id(trade_id).await?;
    ensure_can_manage(&caller, &existing)?;
    ledger.delete(trade_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[get("/items/{item_id}/trades")]
pub async fn trades_by_item(
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let item_id = parse_id(&path)?;
    let trades = db.trades().find_by_item_id(item_id).await?;
    Ok(HttpResponse::Ok().json(TradeListResponse::from(trades)))
}

#[get("/users/{user_id}/trades")]
pub async fn trades_by_user(
    path: web::Path<String>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let user_id = parse_id(&path)?;
    let trades = db.trades().find_by_user_id(user_id).await?;
    Ok(HttpResponse::Ok().json(TradeListResponse::from(trades)))
}

fn ensure_can_manage(caller: &AuthenticatedUser, trade: &Trade) -> Result<()> {
    if caller.can_manage(trade.user_id) {
        Ok(())
    } else {
        log::warn!(
            "User {} tried to modify trade {} owned by {}",
            caller.user_id,
            trade.id,
            trade.user_id
        );
        Err(ExchangeError::Forbidden("only the owner may modify a trade".to_string()))
    }
}
