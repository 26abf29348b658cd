use serde::{Deserialize, Serialize};

use crate::{Money, ProductId, SellerId};

/// A product listing as held by the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Unit price in minor currency units.
    pub price: Money,
    #[serde(default)]
    pub picture_url: String,
    #[serde(default)]
    pub category: String,
    pub seller_id: SellerId,
    #[serde(default)]
    pub seller_name: String,
    /// Units available for sale.
    pub quantity: u32,
}

impl Product {
    /// Creates a product with the fields the order engine depends on.
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        seller_id: impl Into<SellerId>,
        price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            price,
            picture_url: String::new(),
            category: String::new(),
            seller_id: seller_id.into(),
            seller_name: String::new(),
            quantity,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_seller_name(mut self, seller_name: impl Into<String>) -> Self {
        self.seller_name = seller_name.into();
        self
    }

    pub fn with_picture_url(mut self, picture_url: impl Into<String>) -> Self {
        self.picture_url = picture_url.into();
        self
    }

    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_without_optional_fields_deserializes() {
        let json = serde_json::json!({
            "id": "p1",
            "title": "Desk lamp",
            "price": 1999,
            "seller_id": "s1",
            "quantity": 4
        });

        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.price, Money::from_cents(1999));
        assert_eq!(product.seller_id, SellerId::new("s1"));
        assert!(product.description.is_empty());
        assert!(product.is_in_stock());
    }
}
