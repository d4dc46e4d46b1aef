//! Order placement and lifecycle service.

use chrono::Utc;
use common::{OrderId, UserId};

use crate::access::{Actor, Role, authorize, authorize_owner_or_admin};
use crate::cart::Cart;
use crate::error::{DomainError, Resource};
use crate::store::{StockDelta, Store};
use crate::user::User;

use super::{CustomerDetails, Order, OrderStatus, PaymentMethod, RiderSnapshot};

/// Service for placing orders and advancing them through their lifecycle.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Snapshots the actor's cart into a new order and clears the cart.
    ///
    /// Stock is not re-reserved; every line was reserved at cart-add
    /// time. The insert and the cart clear are one atomic store
    /// operation: either the order exists and the cart is empty, or
    /// neither happened.
    #[tracing::instrument(skip(self, actor, customer_details))]
    pub async fn create_order(
        &self,
        actor: &Actor,
        customer_details: CustomerDetails,
        payment_method: PaymentMethod,
    ) -> Result<Order, DomainError> {
        let cart = self
            .store
            .get_cart(actor.id)
            .await?
            .unwrap_or_else(|| Cart::empty(actor.id));

        let order = Order::from_cart(&cart, customer_details, payment_method)?;
        self.store.insert_order_clearing_cart(&order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total_price, "order created");
        Ok(order)
    }

    /// Moves an order to `target` on behalf of `actor`.
    ///
    /// Admins may perform any legal transition. Riders may only mark
    /// orders assigned to them as delivered. Customers may not change
    /// status at all. Shipping requires an assigned rider; one supplied
    /// with the call is validated and assigned in the same write.
    /// Cancelling releases every line's stock in the same write.
    #[tracing::instrument(skip(self, actor))]
    pub async fn transition(
        &self,
        actor: &Actor,
        order_id: OrderId,
        target: OrderStatus,
        rider_id: Option<UserId>,
    ) -> Result<Order, DomainError> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(DomainError::NotFound(Resource::Order))?;

        match actor.role {
            Role::Admin => {}
            Role::Rider => {
                if order.assigned_rider_id() != Some(actor.id) {
                    return Err(DomainError::Forbidden("order is not assigned to this rider"));
                }
                if target != OrderStatus::Delivered {
                    return Err(DomainError::Forbidden(
                        "riders may only mark shipped orders as delivered",
                    ));
                }
            }
            Role::Customer => {
                return Err(DomainError::Forbidden("customers may not change order status"));
            }
        }

        if !order.status.allows(target) {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        if target == OrderStatus::Shipped {
            // Assign-then-ship is one logical step, never two writes.
            match rider_id {
                Some(rider) => {
                    let user = self.require_rider(rider).await?;
                    order.assigned_rider = Some(RiderSnapshot::of(&user));
                }
                None if order.assigned_rider.is_some() => {}
                None => return Err(DomainError::RiderRequired),
            }
        }

        let releases: Vec<StockDelta> = if target == OrderStatus::Cancelled {
            order
                .lines
                .iter()
                .map(|l| StockDelta::release(l.product_id, l.variant.clone(), l.quantity))
                .collect()
        } else {
            Vec::new()
        };

        let expected = order.revision;
        order.status = target;
        order.revision = expected + 1;
        order.updated_at = Utc::now();

        self.store.update_order(&order, expected, &releases).await?;

        metrics::counter!("order_transitions_total", "to" => target.as_str()).increment(1);
        tracing::info!(order_id = %order.id, status = %target, "order transitioned");
        Ok(order)
    }

    /// Assigns a rider to a non-terminal order (admin only).
    #[tracing::instrument(skip(self, actor))]
    pub async fn assign_rider(
        &self,
        actor: &Actor,
        order_id: OrderId,
        rider_id: UserId,
    ) -> Result<Order, DomainError> {
        authorize(actor.role, Role::Admin)?;

        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(DomainError::NotFound(Resource::Order))?;

        if order.is_terminal() {
            return Err(DomainError::Validation(
                "cannot assign a rider to a delivered or cancelled order".to_string(),
            ));
        }

        let rider = self.require_rider(rider_id).await?;

        let expected = order.revision;
        order.assigned_rider = Some(RiderSnapshot::of(&rider));
        order.revision = expected + 1;
        order.updated_at = Utc::now();

        self.store.update_order(&order, expected, &[]).await?;
        Ok(order)
    }

    /// Loads an order, visible to its owner, an admin, or the assigned
    /// rider.
    pub async fn get(&self, actor: &Actor, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(DomainError::NotFound(Resource::Order))?;

        if order.assigned_rider_id() == Some(actor.id) {
            return Ok(order);
        }
        authorize_owner_or_admin(actor, order.customer)?;
        Ok(order)
    }

    /// Lists the actor's own orders, newest first.
    pub async fn list_for_customer(&self, actor: &Actor) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders_for_customer(actor.id).await?)
    }

    /// Lists every order (admin only), newest first.
    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<Order>, DomainError> {
        authorize(actor.role, Role::Admin)?;
        Ok(self.store.list_orders().await?)
    }

    /// Lists the orders assigned to the acting rider, newest first.
    pub async fn list_for_rider(&self, actor: &Actor) -> Result<Vec<Order>, DomainError> {
        authorize(actor.role, Role::Rider)?;
        Ok(self.store.list_orders_for_rider(actor.id).await?)
    }

    async fn require_rider(&self, rider: UserId) -> Result<User, DomainError> {
        match self.store.get_user(rider).await? {
            Some(user) if user.role == Role::Rider => Ok(user),
            _ => Err(DomainError::NotFound(Resource::Rider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartService;
    use crate::catalog::{Product, ProductVariant};
    use crate::store::StoreError;
    use crate::user::{RiderDetails, VehicleType};
    use common::{Money, ProductId, VariantKey};
    use doc_store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        carts: CartService<MemoryStore>,
        orders: OrderService<MemoryStore>,
        customer: Actor,
        admin: Actor,
        product_id: ProductId,
        key: VariantKey,
    }

    async fn fixture(stock: u32, price_cents: i64) -> Fixture {
        let store = MemoryStore::new();
        let product = Product {
            id: ProductId::new(),
            title: "Arcade Stick".to_string(),
            description: None,
            category: "Controllers".to_string(),
            brand: "Hori".to_string(),
            variants: vec![ProductVariant {
                color: "Black".to_string(),
                size: "Standard".to_string(),
                stock,
                price: Money::from_cents(price_cents),
                sku: None,
                image: None,
            }],
        };
        let product_id = product.id;
        store.put_product(&product).await.unwrap();

        Fixture {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
            customer: Actor::new(UserId::new(), Role::Customer),
            admin: Actor::new(UserId::new(), Role::Admin),
            product_id,
            key: VariantKey::new("Black", "Standard"),
        }
    }

    fn details() -> CustomerDetails {
        CustomerDetails {
            name: "Dana Cruz".to_string(),
            phone: "555-0142".to_string(),
            address: "7 Arcade Row".to_string(),
        }
    }

    async fn seed_rider(store: &MemoryStore) -> Actor {
        let rider = User::rider(
            "sub-rider".to_string(),
            "Kim Reyes".to_string(),
            "kim@example.com".to_string(),
            Some("555-0100".to_string()),
            Some(RiderDetails {
                vehicle_type: Some(VehicleType::Bike),
                license_number: None,
            }),
        );
        let actor = Actor::new(rider.id, Role::Rider);
        store.put_user(&rider).await.unwrap();
        actor
    }

    async fn stock_of(f: &Fixture) -> u32 {
        f.store
            .get_product(f.product_id)
            .await
            .unwrap()
            .unwrap()
            .variant(&f.key)
            .unwrap()
            .stock
    }

    async fn placed_order(f: &Fixture, quantity: u32) -> Order {
        f.carts
            .add_or_update(&f.customer, f.product_id, f.key.clone(), quantity)
            .await
            .unwrap();
        f.orders
            .create_order(&f.customer, details(), PaymentMethod::CreditCard)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn checkout_snapshots_cart_without_touching_stock() {
        let f = fixture(5, 2000).await;
        f.carts
            .add_or_update(&f.customer, f.product_id, f.key.clone(), 3)
            .await
            .unwrap();
        assert_eq!(stock_of(&f).await, 2);

        let order = f
            .orders
            .create_order(&f.customer, details(), PaymentMethod::CreditCard)
            .await
            .unwrap();

        assert_eq!(order.total_price, Money::from_cents(6000));
        assert_eq!(order.status, OrderStatus::Paid);
        // Cart moved into the order; stock reserved at add time stays put.
        assert!(f.carts.snapshot(&f.customer).await.unwrap().is_empty());
        assert_eq!(stock_of(&f).await, 2);
    }

    #[tokio::test]
    async fn checkout_with_empty_cart_fails() {
        let f = fixture(5, 2000).await;
        let result = f
            .orders
            .create_order(&f.customer, details(), PaymentMethod::CreditCard)
            .await;
        assert!(matches!(result, Err(DomainError::EmptyCart)));
    }

    #[tokio::test]
    async fn cash_on_delivery_orders_start_pending() {
        let f = fixture(5, 2000).await;
        f.carts
            .add_or_update(&f.customer, f.product_id, f.key.clone(), 1)
            .await
            .unwrap();
        let order = f
            .orders
            .create_order(&f.customer, details(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn skipping_statuses_is_rejected() {
        let f = fixture(5, 2000).await;
        f.carts
            .add_or_update(&f.customer, f.product_id, f.key.clone(), 1)
            .await
            .unwrap();
        let order = f
            .orders
            .create_order(&f.customer, details(), PaymentMethod::CashOnDelivery)
            .await
            .unwrap();

        let result = f
            .orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, None)
            .await;
        assert!(matches!(
            result,
            Err(DomainError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped,
            })
        ));
    }

    #[tokio::test]
    async fn customers_may_not_transition() {
        let f = fixture(5, 2000).await;
        let order = placed_order(&f, 1).await;
        let result = f
            .orders
            .transition(&f.customer, order.id, OrderStatus::Processing, None)
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn shipping_without_a_rider_is_rejected() {
        let f = fixture(5, 2000).await;
        let order = placed_order(&f, 1).await;
        let result = f
            .orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, None)
            .await;
        assert!(matches!(result, Err(DomainError::RiderRequired)));
    }

    #[tokio::test]
    async fn shipping_assigns_a_supplied_rider_atomically() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        let shipped = f
            .orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();

        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.assigned_rider_id(), Some(rider.id));
        // The order records the rider's identity at assignment time.
        assert_eq!(shipped.assigned_rider.as_ref().unwrap().name, "Kim Reyes");
        assert!(shipped.updated_at > order.updated_at || shipped.revision > order.revision);
    }

    #[tokio::test]
    async fn shipping_with_an_unknown_rider_fails() {
        let f = fixture(5, 2000).await;
        let order = placed_order(&f, 1).await;
        let result = f
            .orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(UserId::new()))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound(Resource::Rider))));
    }

    #[tokio::test]
    async fn assigned_rider_delivers_their_own_order() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        f.orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();
        let delivered = f
            .orders
            .transition(&rider, order.id, OrderStatus::Delivered, None)
            .await
            .unwrap();

        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.is_terminal());
    }

    #[tokio::test]
    async fn rider_cannot_touch_unassigned_orders() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let other_rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        f.orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();
        let result = f
            .orders
            .transition(&other_rider, order.id, OrderStatus::Delivered, None)
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn rider_cannot_cancel() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        f.orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();
        let result = f
            .orders
            .transition(&rider, order.id, OrderStatus::Cancelled, None)
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn delivered_orders_are_immutable() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        f.orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();
        f.orders
            .transition(&rider, order.id, OrderStatus::Delivered, None)
            .await
            .unwrap();

        for target in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            let result = f.orders.transition(&f.admin, order.id, target, None).await;
            assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
        }
    }

    #[tokio::test]
    async fn cancelling_releases_reserved_stock() {
        let f = fixture(5, 2000).await;
        let order = placed_order(&f, 3).await;
        assert_eq!(stock_of(&f).await, 2);

        let cancelled = f
            .orders
            .transition(&f.admin, order.id, OrderStatus::Cancelled, None)
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&f).await, 5);
    }

    #[tokio::test]
    async fn stale_revision_writes_are_rejected() {
        let f = fixture(5, 2000).await;
        let order = placed_order(&f, 1).await;

        // A concurrent admin moved the order first.
        f.orders
            .transition(&f.admin, order.id, OrderStatus::Processing, None)
            .await
            .unwrap();

        // Replay the same transition against the stale document.
        let mut stale = order.clone();
        let expected = stale.revision;
        stale.status = OrderStatus::Processing;
        stale.revision = expected + 1;
        let result = f.store.update_order(&stale, expected, &[]).await;
        assert!(matches!(
            result,
            Err(StoreError::RevisionConflict { .. })
        ));
    }

    #[tokio::test]
    async fn assign_rider_is_admin_only_and_not_terminal() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        let result = f.orders.assign_rider(&f.customer, order.id, rider.id).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));

        let updated = f.orders.assign_rider(&f.admin, order.id, rider.id).await.unwrap();
        assert_eq!(updated.assigned_rider_id(), Some(rider.id));

        f.orders
            .transition(&f.admin, order.id, OrderStatus::Cancelled, None)
            .await
            .unwrap();
        let result = f.orders.assign_rider(&f.admin, order.id, rider.id).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn order_visibility_is_owner_admin_or_assigned_rider() {
        let f = fixture(5, 2000).await;
        let rider = seed_rider(&f.store).await;
        let order = placed_order(&f, 1).await;

        assert!(f.orders.get(&f.customer, order.id).await.is_ok());
        assert!(f.orders.get(&f.admin, order.id).await.is_ok());

        let stranger = Actor::new(UserId::new(), Role::Customer);
        assert!(matches!(
            f.orders.get(&stranger, order.id).await,
            Err(DomainError::Forbidden(_))
        ));

        assert!(matches!(
            f.orders.get(&rider, order.id).await,
            Err(DomainError::Forbidden(_))
        ));
        f.orders
            .transition(&f.admin, order.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();
        assert!(f.orders.get(&rider, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn listings_are_scoped_by_role() {
        let f = fixture(10, 2000).await;
        let rider = seed_rider(&f.store).await;
        let first = placed_order(&f, 1).await;
        let second = placed_order(&f, 2).await;

        f.orders
            .transition(&f.admin, second.id, OrderStatus::Shipped, Some(rider.id))
            .await
            .unwrap();

        let own = f.orders.list_for_customer(&f.customer).await.unwrap();
        assert_eq!(own.len(), 2);

        let all = f.orders.list_all(&f.admin).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(matches!(
            f.orders.list_all(&f.customer).await,
            Err(DomainError::Forbidden(_))
        ));

        let assigned = f.orders.list_for_rider(&rider).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, second.id);
        let _ = first;
    }
}
