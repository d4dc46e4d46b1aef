//! Catalog browse endpoints and the admin stock-mutation contract.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::VariantKey;
use domain::catalog::Product;
use domain::error::{DomainError, Resource};
use domain::store::Store;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

use super::parse_product_id;

#[derive(Deserialize)]
pub struct RestockRequest {
    pub color: String,
    pub size: String,
    /// Signed stock adjustment; the floor of zero is always enforced.
    pub delta: i64,
}

#[derive(Serialize)]
pub struct RestockResponse {
    pub message: &'static str,
    pub stock: u32,
}

/// GET /products — list the catalog (public).
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .store
        .list_products()
        .await
        .map_err(DomainError::from)?;
    Ok(Json(products))
}

/// GET /products/{id} — fetch one product (public).
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state
        .store
        .get_product(id)
        .await
        .map_err(DomainError::from)?
        .ok_or(DomainError::NotFound(Resource::Product))?;
    Ok(Json(product))
}

/// PATCH /products/{id}/stock — adjust a variant's stock (admin only).
#[tracing::instrument(skip(state, identity, req))]
pub async fn restock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<RestockResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let id = parse_product_id(&id)?;
    let variant = VariantKey::new(req.color, req.size);

    let stock = state
        .inventory
        .restock(&actor, id, &variant, req.delta)
        .await?;

    Ok(Json(RestockResponse {
        message: "stock updated successfully",
        stock,
    }))
}
