use actix_web::{delete, get, post, web, HttpResponse};
use common::{parse_id, Item};
use serde::{Deserialize, Serialize};

use crate::{
    db::{Database, ItemRecord},
    error::{ExchangeError, Result},
};

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub rarity: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    pub item: Item,
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub success: bool,
    pub items: Vec<Item>,
}

#[get("/items")]
pub async fn list_items(db: web::Data<Database>) -> Result<HttpResponse> {
    let items = db
        .items()
        .find_all()
        .await?
        .into_iter()
        .map(Item::from)
        .collect();

    Ok(HttpResponse::Ok().json(ItemListResponse {
        success: true,
        items,
    }))
}

#[get("/items/{item_id}")]
pub async fn get_item(path: web::Path<String>, db: web::Data<Database>) -> Result<HttpResponse> {
    let item_id = parse_id(&path)?;
    let item = db
        .items()
        .find_by_id(item_id)
        .await?
        .ok_or_else(|| ExchangeError::NotFound(format!("item {item_id}")))?;

    Ok(HttpResponse::Ok().json(ItemResponse {
        success: true,
        item: item.into(),
    }))
}

#[post("/admin/items")]
pub async fn create_item(
    req: web::Json<CreateItemRequest>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    if req.name.trim().is_empty() {
        return Err(ExchangeError::Validation("item name is required".to_string()));
    }
    if req.rarity.trim().is_empty() {
        return Err(ExchangeError::Validation("item rarity is required".to_string()));
    }

    let req = req.into_inner();
    let record = ItemRecord::new(req.name, req.rarity, req.description);
    db.items().create(&record).await?;

    Ok(HttpResponse::Created().json(ItemResponse {
        success: true,
        item: record.into(),
    }))
}

/// Items still referenced by a trade cannot be removed (409).
#[delete("/admin/items/{item_id}")]
pub async fn delete_item(path: web::Path<String>, db: web::Data<Database>) -> Result<HttpResponse> {
    let item_id = parse_id(&path)?;
    db.items().delete(item_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
