//! Rider-facing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

use super::orders::OrdersResponse;

/// GET /rider/orders — orders assigned to the acting rider.
#[tracing::instrument(skip(state, identity))]
pub async fn orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
) -> Result<Json<OrdersResponse>, ApiError> {
    let actor = state.actor(&identity).await?;
    let orders = state.orders.list_for_rider(&actor).await?;
    Ok(Json(OrdersResponse { orders }))
}
