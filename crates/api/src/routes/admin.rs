//! Admin endpoints: order oversight and rider management.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::access::Role;
use domain::store::Store;
use domain::user::{NewRider, RiderOverview, RiderUpdate, User};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

use super::orders::OrdersResponse;
use super::parse_user_id;

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Serialize)]
pub struct RidersResponse {
    pub riders: Vec<RiderOverview>,
}

#[derive(Serialize)]
pub struct RiderResponse {
    pub message: &'static str,
    pub rider: User,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /admin/orders — every order, newest first.
#[tracing::instrument(skip(state, identity))]
pub async fn orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<OrdersResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let orders = state.orders.list_all(&actor).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// GET /admin/riders — riders with their assigned-order counts.
#[tracing::instrument(skip(state, identity))]
pub async fn list_riders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<RidersResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let riders = state.directory.list_riders(&actor).await?;
    Ok(Json(RidersResponse { riders }))
}

/// POST /admin/riders — register a new rider account.
#[tracing::instrument(skip(state, identity, req))]
pub async fn create_rider<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Json(req): Json<NewRider>,
) -> Result<(StatusCode, Json<RiderResponse>), ApiError> {
    let actor = state.actor(&identity).await?;
    let rider = state.directory.create_rider(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RiderResponse {
            message: "rider created successfully",
            rider,
        }),
    ))
}

/// PUT /admin/riders/{id} — update a rider account.
#[tracing::instrument(skip(state, identity, req))]
pub async fn update_rider<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<RiderUpdate>,
) -> Result<Json<RiderResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let rider_id = parse_user_id(&id)?;
    let rider = state.directory.update_rider(&actor, rider_id, req).await?;
    Ok(Json(RiderResponse {
        message: "rider updated successfully",
        rider,
    }))
}

/// DELETE /admin/riders/{id} — delete a rider account.
#[tracing::instrument(skip(state, identity))]
pub async fn delete_rider<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let rider_id = parse_user_id(&id)?;
    state.directory.delete_rider(&actor, rider_id).await?;
    Ok(Json(MessageResponse {
        message: "rider deleted successfully",
    }))
}

/// GET /admin/riders/{id}/orders — orders assigned to one rider.
#[tracing::instrument(skip(state, identity))]
pub async fn rider_orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let rider_id = parse_user_id(&id)?;
    let orders = state.directory.rider_orders(&actor, rider_id).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// PATCH /admin/users/{id}/role — change another user's role.
#[tracing::instrument(skip(state, identity, req))]
pub async fn set_role<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let user_id = parse_user_id(&id)?;
    let user = state.directory.set_role(&actor, user_id, req.role).await?;
    Ok(Json(UserResponse { user }))
}
