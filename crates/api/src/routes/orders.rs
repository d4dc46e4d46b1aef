//! Order placement and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::order::{CustomerDetails, Order, OrderStatus, PaymentMethod};
use domain::store::Store;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

use super::{parse_order_id, parse_user_id};

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_details: CustomerDetails,
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    /// Rider to assign while shipping, as one atomic step.
    #[serde(default)]
    pub rider_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignRiderRequest {
    pub rider_id: String,
}

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub message: &'static str,
    pub order: Order,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// POST /orders — snapshot the caller's cart into a new order.
#[tracing::instrument(skip(state, identity, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let actor = state.actor(&identity).await?;

    let order = state
        .orders
        .create_order(&actor, req.customer_details, req.payment_method)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            message: "order created successfully",
            order,
        }),
    ))
}

/// GET /orders — the caller's orders, newest first.
#[tracing::instrument(skip(state, identity))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<OrdersResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let orders = state.orders.list_for_customer(&actor).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// GET /orders/{id} — one order, visible to its owner, an admin, or the
/// assigned rider.
#[tracing::instrument(skip(state, identity))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let order_id = parse_order_id(&id)?;
    let order = state.orders.get(&actor, order_id).await?;
    Ok(Json(OrderResponse { order }))
}

/// PATCH /orders/{id}/status — advance the order lifecycle.
#[tracing::instrument(skip(state, identity, req))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let order_id = parse_order_id(&id)?;
    let rider_id: Option<UserId> = req.rider_id.as_deref().map(parse_user_id).transpose()?;

    let order = state
        .orders
        .transition(&actor, order_id, req.status, rider_id)
        .await?;
    Ok(Json(OrderResponse { order }))
}

/// PATCH /orders/{id}/assign-rider — assign a rider (admin only).
#[tracing::instrument(skip(state, identity, req))]
pub async fn assign_rider<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<AssignRiderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let order_id = parse_order_id(&id)?;
    let rider_id = parse_user_id(&req.rider_id)?;

    let order = state.orders.assign_rider(&actor, order_id, rider_id).await?;
    Ok(Json(OrderResponse { order }))
}
