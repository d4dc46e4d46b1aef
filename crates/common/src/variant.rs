use serde::{Deserialize, Serialize};

/// Identity of a purchasable variant within a product.
///
/// A variant is a specific color/size combination with its own stock and
/// price. Two keys are equal iff both color and size match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub color: String,
    pub size: String,
}

impl VariantKey {
    /// Creates a new variant key.
    pub fn new(color: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
        }
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.color, self.size)
    }
}
