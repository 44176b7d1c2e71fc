use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Price of a food at one supermarket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePrice {
    pub name: String,
    pub price: f64,
}

/// A food item with its per-store price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub unit: String,
    pub image: Option<String>,
    pub supermarkets: Vec<StorePrice>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields supplied when registering a new food.
#[derive(Debug, Clone, Default)]
pub struct FoodDraft {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub unit: String,
    pub image: Option<String>,
    pub supermarkets: Vec<StorePrice>,
}

/// Partial update for a food. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FoodPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supermarkets: Option<Vec<StorePrice>>,
}

impl FoodPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.unit.is_none()
            && self.image.is_none()
            && self.supermarkets.is_none()
    }
}

/// One cart line: a food reference and the quantity wanted.
///
/// The cart is local-only. It stores ids, not food snapshots, so a
/// price edit before checkout is reflected in the cart total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub food_id: String,
    pub quantity: u32,
}

/// A cart line joined against the food cache.
#[derive(Debug, Clone)]
pub struct CartEntry {
    pub food: Food,
    pub quantity: u32,
}

impl CartEntry {
    pub fn subtotal(&self) -> f64 {
        self.food.price * self.quantity as f64
    }
}

/// One line item inside an order. A snapshot of the food at checkout
/// time, so later edits to the food do not change order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub supermarkets: Vec<StorePrice>,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// A completed order. `total` is computed at checkout and never
/// recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub date: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Row shape returned by the `foods` table.
#[derive(Debug, Deserialize)]
pub(crate) struct FoodRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub unit: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub supermarkets: Vec<StorePrice>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<FoodRow> for Food {
    fn from(row: FoodRow) -> Self {
        Food {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            unit: row.unit,
            image: row.image,
            supermarkets: row.supermarkets,
            created_at: row.created_at,
        }
    }
}

/// Insert payload for the `foods` table.
#[derive(Debug, Serialize)]
pub(crate) struct NewFoodRow {
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub supermarkets: Vec<StorePrice>,
}

impl NewFoodRow {
    pub fn from_draft(user_id: Uuid, draft: FoodDraft) -> Self {
        NewFoodRow {
            user_id,
            name: draft.name,
            category: draft.category,
            price: draft.price,
            unit: draft.unit,
            image: draft.image,
            supermarkets: draft.supermarkets,
        }
    }
}

/// Insert payload for the `orders` table.
#[derive(Debug, Serialize)]
pub(crate) struct NewOrderRow {
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub date: String,
}

/// Accepts both string and integer primary keys.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
