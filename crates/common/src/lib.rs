pub mod ids;
pub mod money;
pub mod variant;

pub use ids::{OrderId, ProductId, UserId};
pub use money::Money;
pub use variant::VariantKey;
