//! HTTP API server for the storefront order/cart/stock core.
//!
//! Exposes the cart, order, rider, and admin surfaces over REST with
//! structured logging (tracing) and Prometheus metrics. Callers are
//! pre-authenticated by a fronting identity provider; see
//! [`identity::Identity`].

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use domain::access::Actor;
use domain::cart::CartService;
use domain::catalog::InventoryLedger;
use domain::error::DomainError;
use domain::order::OrderService;
use domain::store::Store;
use domain::user::UserDirectory;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::ApiError;
use identity::Identity;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub inventory: InventoryLedger<S>,
    pub directory: UserDirectory<S>,
    pub store: S,
}

impl<S: Store + Clone> AppState<S> {
    /// Creates the application state over one shared store.
    pub fn new(store: S) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            inventory: InventoryLedger::new(store.clone()),
            directory: UserDirectory::new(store.clone()),
            store,
        }
    }
}

impl<S: Store> AppState<S> {
    /// Resolves the request identity to an internal actor.
    pub async fn actor(&self, identity: &Identity) -> Result<Actor, ApiError> {
        match self.directory.lookup(&identity.subject_id).await {
            Ok(user) => Ok(user.actor()),
            Err(DomainError::NotFound(_)) => Err(ApiError::unknown_subject()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}/stock", patch(routes::products::restock::<S>))
        .route("/cart/add", post(routes::cart::add::<S>))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/count", get(routes::cart::count::<S>))
        .route("/cart/remove/{product_id}", delete(routes::cart::remove::<S>))
        .route("/cart/clear", delete(routes::cart::clear::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", patch(routes::orders::update_status::<S>))
        .route(
            "/orders/{id}/assign-rider",
            patch(routes::orders::assign_rider::<S>),
        )
        .route("/rider/orders", get(routes::rider::orders::<S>))
        .route("/admin/orders", get(routes::admin::orders::<S>))
        .route("/admin/riders", get(routes::admin::list_riders::<S>))
        .route("/admin/riders", post(routes::admin::create_rider::<S>))
        .route("/admin/riders/{id}", put(routes::admin::update_rider::<S>))
        .route("/admin/riders/{id}", delete(routes::admin::delete_rider::<S>))
        .route(
            "/admin/riders/{id}/orders",
            get(routes::admin::rider_orders::<S>),
        )
        .route("/admin/users/{id}/role", patch(routes::admin::set_role::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the shared application state for a store.
pub fn create_state<S: Store + Clone>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}

/// Seeds a demo catalog and one account per role.
///
/// Local-development helper for the in-memory store; the seeded subjects
/// (`dev-admin`, `dev-customer`, `dev-rider`) can be sent directly in the
/// `x-subject-id` header.
pub async fn seed_demo_data<S: Store>(store: &S) -> Result<(), domain::store::StoreError> {
    use chrono::Utc;
    use common::{Money, ProductId, UserId};
    use domain::access::Role;
    use domain::catalog::{Product, ProductVariant};
    use domain::user::{RiderDetails, User, VehicleType};

    let products = [
        Product {
            id: ProductId::new(),
            title: "DualSense Wireless Controller".to_string(),
            description: Some("Haptic feedback, adaptive triggers".to_string()),
            category: "Controllers".to_string(),
            brand: "Sony".to_string(),
            variants: vec![
                ProductVariant {
                    color: "White".to_string(),
                    size: "Standard".to_string(),
                    stock: 25,
                    price: Money::from_cents(6999),
                    sku: Some("DS-WHT".to_string()),
                    image: None,
                },
                ProductVariant {
                    color: "Midnight Black".to_string(),
                    size: "Standard".to_string(),
                    stock: 14,
                    price: Money::from_cents(6999),
                    sku: Some("DS-BLK".to_string()),
                    image: None,
                },
            ],
        },
        Product {
            id: ProductId::new(),
            title: "Pro Gaming Headset".to_string(),
            description: None,
            category: "Audio".to_string(),
            brand: "SteelSeries".to_string(),
            variants: vec![ProductVariant {
                color: "Black".to_string(),
                size: "Standard".to_string(),
                stock: 40,
                price: Money::from_cents(9950),
                sku: Some("HS-BLK".to_string()),
                image: None,
            }],
        },
        Product {
            id: ProductId::new(),
            title: "Esports Jersey".to_string(),
            description: None,
            category: "Apparel".to_string(),
            brand: "Fnatic".to_string(),
            variants: vec![
                ProductVariant {
                    color: "Orange".to_string(),
                    size: "M".to_string(),
                    stock: 12,
                    price: Money::from_cents(4500),
                    sku: None,
                    image: None,
                },
                ProductVariant {
                    color: "Orange".to_string(),
                    size: "L".to_string(),
                    stock: 8,
                    price: Money::from_cents(4500),
                    sku: None,
                    image: None,
                },
            ],
        },
    ];
    for product in &products {
        store.put_product(product).await?;
    }

    let now = Utc::now();
    let accounts = [
        User {
            id: UserId::new(),
            subject_id: "dev-admin".to_string(),
            name: "Dev Admin".to_string(),
            email: "admin@storefront.dev".to_string(),
            phone: None,
            address: None,
            role: Role::Admin,
            rider_details: None,
            created_at: now,
            updated_at: now,
        },
        User {
            id: UserId::new(),
            subject_id: "dev-customer".to_string(),
            name: "Dev Customer".to_string(),
            email: "customer@storefront.dev".to_string(),
            phone: Some("555-0142".to_string()),
            address: Some("7 Arcade Row".to_string()),
            role: Role::Customer,
            rider_details: None,
            created_at: now,
            updated_at: now,
        },
        User {
            id: UserId::new(),
            subject_id: "dev-rider".to_string(),
            name: "Dev Rider".to_string(),
            email: "rider@storefront.dev".to_string(),
            phone: Some("555-0100".to_string()),
            address: None,
            role: Role::Rider,
            rider_details: Some(RiderDetails {
                vehicle_type: Some(VehicleType::Bike),
                license_number: Some("LIC-001".to_string()),
            }),
            created_at: now,
            updated_at: now,
        },
    ];
    for user in &accounts {
        store.put_user(user).await?;
    }

    Ok(())
}
