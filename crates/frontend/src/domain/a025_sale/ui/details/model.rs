use contracts::domain::a025_sale::lookup::{
    ItemOption, ItemsByLocationQuery, ItemsByLocationResponse, UnitPriceQuery, UnitPriceResponse,
};
use gloo_net::http::Request;
use serde::Serialize;
use thiserror::Error;

pub const ITEMS_ENDPOINT: &str = "get-products-by-branch/";
pub const PRICE_ENDPOINT: &str = "get-product-price/";

/// Ошибка обращения к справочникам формы продажи
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("ошибка сети: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Http(u16),
    #[error("ошибка разбора ответа: {0}")]
    Decode(String),
    #[error("некорректная цена: {0:?}")]
    InvalidPrice(String),
    #[error("ошибка формирования запроса: {0}")]
    Query(String),
}

fn endpoint_url<Q: Serialize>(base: &str, endpoint: &str, query: &Q) -> Result<String, LookupError> {
    let qs = serde_qs::to_string(query).map_err(|e| LookupError::Query(e.to_string()))?;
    let base = base.trim_end_matches('/');
    Ok(format!("{}/{}?{}", base, endpoint, qs))
}

pub fn items_url(base: &str, location_id: &str) -> Result<String, LookupError> {
    endpoint_url(
        base,
        ITEMS_ENDPOINT,
        &ItemsByLocationQuery {
            branch_id: location_id.to_string(),
        },
    )
}

pub fn price_url(base: &str, location_id: &str, item_id: &str) -> Result<String, LookupError> {
    endpoint_url(
        base,
        PRICE_ENDPOINT,
        &UnitPriceQuery {
            branch_id: location_id.to_string(),
            product_id: item_id.to_string(),
        },
    )
}

async fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, LookupError> {
    let response = Request::get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| LookupError::Network(e.to_string()))?;
    if !response.ok() {
        return Err(LookupError::Http(response.status()));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| LookupError::Decode(e.to_string()))
}

/// Товары, доступные в филиале
pub async fn fetch_items_by_location(
    base: &str,
    location_id: &str,
) -> Result<Vec<ItemOption>, LookupError> {
    let url = items_url(base, location_id)?;
    let data: ItemsByLocationResponse = get_json(&url).await?;
    log::debug!("loaded {} items for location {}", data.products.len(), location_id);
    Ok(data.products)
}

/// Цена товара в филиале
pub async fn fetch_unit_price(
    base: &str,
    location_id: &str,
    item_id: &str,
) -> Result<f64, LookupError> {
    let url = price_url(base, location_id, item_id)?;
    let data: UnitPriceResponse = get_json(&url).await?;
    data.price_value()
        .ok_or_else(|| LookupError::InvalidPrice(data.price.clone()))
}
