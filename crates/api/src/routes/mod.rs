pub mod admin;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod rider;

use common::{OrderId, ProductId, UserId};

use crate::error::ApiError;

fn parse_uuid(id: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

pub(crate) fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    Ok(ProductId::from_uuid(parse_uuid(id)?))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    Ok(OrderId::from_uuid(parse_uuid(id)?))
}

pub(crate) fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    Ok(UserId::from_uuid(parse_uuid(id)?))
}
