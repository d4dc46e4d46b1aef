//! Order model, status machine, and order service.

mod service;
mod status;

pub use service::OrderService;
pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId, VariantKey};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::error::DomainError;
use crate::user::User;

/// Contact details copied into the order at checkout.
///
/// A snapshot, not a reference: later profile edits do not alter the
/// order's delivery record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl CustomerDetails {
    pub(crate) fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "customer {field} must not be blank"
                )));
            }
        }
        Ok(())
    }
}

/// How the customer pays for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns true when payment is collected at delivery time.
    pub fn is_deferred(&self) -> bool {
        matches!(self, PaymentMethod::CashOnDelivery)
    }

    /// The status a fresh order starts in for this payment method.
    pub fn initial_status(&self) -> OrderStatus {
        if self.is_deferred() {
            OrderStatus::Pending
        } else {
            OrderStatus::Paid
        }
    }
}

/// Rider identity copied into the order at assignment time.
///
/// A snapshot rather than a live reference: later edits to the rider's
/// account do not retroactively change what the order records. The id is
/// kept for authorization of the delivery transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderSnapshot {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RiderSnapshot {
    /// Captures the assignment-relevant fields of a rider account.
    pub fn of(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// An immutable snapshot of one cart line at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant: VariantKey,
    pub quantity: u32,
    pub price: Money,
}

impl OrderLine {
    /// Returns the line subtotal (price x quantity).
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// An order document.
///
/// Lines, total, and customer details are snapshots owned by the order;
/// later catalog or profile changes never alter them. `revision` guards
/// status writes against concurrent updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: UserId,
    pub lines: Vec<OrderLine>,
    pub total_price: Money,
    pub customer_details: CustomerDetails,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    #[serde(default)]
    pub assigned_rider: Option<RiderSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "first_revision")]
    pub revision: i64,
}

fn first_revision() -> i64 {
    1
}

impl Order {
    /// Snapshots a cart into a fresh order.
    ///
    /// The total is recomputed from line subtotals; no client-supplied
    /// total is ever trusted. Stock is not touched: every line was
    /// already reserved at cart-add time.
    pub fn from_cart(
        cart: &Cart,
        customer_details: CustomerDetails,
        payment_method: PaymentMethod,
    ) -> Result<Self, DomainError> {
        customer_details.validate()?;
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let lines: Vec<OrderLine> = cart
            .lines
            .iter()
            .map(|l| OrderLine {
                product_id: l.product_id,
                variant: l.variant.clone(),
                quantity: l.quantity,
                price: l.price,
            })
            .collect();
        let total_price = lines.iter().map(OrderLine::subtotal).sum();

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            customer: cart.user,
            lines,
            total_price,
            customer_details,
            payment_method,
            status: payment_method.initial_status(),
            assigned_rider: None,
            created_at: now,
            updated_at: now,
            revision: first_revision(),
        })
    }

    /// Returns true when the order can no longer change status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the assigned rider's user id, if any.
    pub fn assigned_rider_id(&self) -> Option<UserId> {
        self.assigned_rider.as_ref().map(|r| r.id)
    }
}
