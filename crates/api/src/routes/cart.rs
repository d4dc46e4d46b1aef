//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::VariantKey;
use domain::cart::Cart;
use domain::store::Store;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

use super::parse_product_id;

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    pub variant: VariantKey,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct RemoveFromCartRequest {
    pub variant: VariantKey,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u32,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /cart/add — add a variant or replace an existing line's quantity.
#[tracing::instrument(skip(state, identity, req))]
pub async fn add<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<Cart>, ApiError> {
    let actor = state.actor(&identity).await?;
    let product_id = parse_product_id(&req.product_id)?;

    let cart = state
        .carts
        .add_or_update(&actor, product_id, req.variant, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// GET /cart — the caller's cart, empty when none exists.
#[tracing::instrument(skip(state, identity))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<Cart>, ApiError> {
    let actor = state.actor(&identity).await?;
    let cart = state.carts.snapshot(&actor).await?;
    Ok(Json(cart))
}

/// GET /cart/count — total quantity across the caller's cart lines.
#[tracing::instrument(skip(state, identity))]
pub async fn count<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<CountResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let count = state.carts.count_items(&actor).await?;
    Ok(Json(CountResponse { count }))
}

/// DELETE /cart/remove/{product_id} — remove a line, releasing its stock.
///
/// Removing an absent line is a no-op returning the current snapshot.
#[tracing::instrument(skip(state, identity, req))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(product_id): Path<String>,
    Json(req): Json<RemoveFromCartRequest>,
) -> Result<Json<Cart>, ApiError> {
    let actor = state.actor(&identity).await?;
    let product_id = parse_product_id(&product_id)?;

    let cart = state.carts.remove(&actor, product_id, &req.variant).await?;
    Ok(Json(cart))
}

/// DELETE /cart/clear — empty the cart, releasing every line's stock.
#[tracing::instrument(skip(state, identity))]
pub async fn clear<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    state.carts.clear(&actor).await?;
    Ok(Json(MessageResponse {
        message: "cart cleared successfully",
    }))
}
