use bson::oid::ObjectId;
use bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal128::as_decimal128;

/// Catalogue entry as stored in the `products` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    /// Stored as Decimal128 so monetary values survive the round trip exactly
    #[serde(with = "as_decimal128")]
    pub price: Decimal,
    pub category: String,
    pub tags: Vec<String>,
    pub available: bool,
    pub stock: i32,
    pub created_date: DateTime,
    pub created_by: String,
}

struct Listing {
    name: &'static str,
    description: &'static str,
    /// Price in cents
    cents: i64,
    category: &'static str,
    tags: [&'static str; 3],
    stock: i32,
}

const CATALOGUE: [Listing; 3] = [
    Listing {
        name: "Notebook Dell Inspiron",
        description: "Notebook para desenvolvimento com 16GB RAM e SSD 512GB",
        cents: 299_999,
        category: "Eletrônicos",
        tags: ["notebook", "dell", "desenvolvimento"],
        stock: 10,
    },
    Listing {
        name: "Mouse Logitech MX Master",
        description: "Mouse ergonômico para produtividade",
        cents: 29_999,
        category: "Acessórios",
        tags: ["mouse", "logitech", "ergonômico"],
        stock: 25,
    },
    Listing {
        name: "Teclado Mecânico Keychron",
        description: "Teclado mecânico sem fio para programadores",
        cents: 59_999,
        category: "Acessórios",
        tags: ["teclado", "mecânico", "keychron"],
        stock: 15,
    },
];

/// The starter catalogue every fresh database starts with
pub fn seed_products(created_by: &str, now: DateTime) -> Vec<Product> {
    CATALOGUE
        .iter()
        .map(|listing| Product {
            id: None,
            name: listing.name.to_string(),
            description: listing.description.to_string(),
            price: Decimal::new(listing.cents, 2),
            category: listing.category.to_string(),
            tags: listing.tags.iter().map(|t| t.to_string()).collect(),
            available: true,
            stock: listing.stock,
            created_date: now,
            created_by: created_by.to_string(),
        })
        .collect()
}
