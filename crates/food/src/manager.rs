//! Food manager
//!
//! Caches foods and orders, keeps the shopping cart, and turns the
//! cart into an immutable order at checkout. Foods and orders live in
//! the backend only; signed out they are simply empty, while the cart
//! always works because it stays in the local store.

use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, warn};

use backend::{ChangeEvent, ChangeKind, Subscription};
use common::store::{LocalStore, keys};

use crate::error::{FoodError, FoodResult};
use crate::models::{CartEntry, CartItem, Food, FoodDraft, FoodPatch, FoodRow, Order, OrderItem};
use crate::remote::RemoteFoodStore;

/// Caches stay valid this long before the next read refetches.
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Timestamp format written into an order at checkout.
const ORDER_DATE_FORMAT: &str = "%Y年%m月%d日 %H:%M:%S";

/// Food, cart and order manager
pub struct FoodManager {
    remote: RemoteFoodStore,
    store: LocalStore,
    foods: Vec<Food>,
    orders: Vec<Order>,
    cart: Vec<CartItem>,
    fetched_at: Option<Instant>,
}

impl FoodManager {
    /// Create a manager, restoring the cart from the local store
    pub fn new(remote: RemoteFoodStore, store: LocalStore) -> Self {
        let cart: Vec<CartItem> = store.load(keys::CART).unwrap_or_default();
        Self {
            remote,
            store,
            foods: Vec::new(),
            orders: Vec::new(),
            cart,
            fetched_at: None,
        }
    }

    /// Refetch foods and orders if the caches have gone stale
    pub async fn refresh(&mut self) -> FoodResult<()> {
        if let Some(at) = self.fetched_at {
            if at.elapsed() < CACHE_TTL {
                return Ok(());
            }
        }
        self.reload().await
    }

    /// Refetch foods and orders regardless of cache age
    pub async fn reload(&mut self) -> FoodResult<()> {
        self.foods = self.remote.fetch_foods().await?;
        self.orders = self.remote.fetch_orders().await?;
        self.fetched_at = Some(Instant::now());
        debug!(
            foods = self.foods.len(),
            orders = self.orders.len(),
            "food caches reloaded"
        );
        Ok(())
    }

    /// Drop the cache timestamp so the next `refresh` refetches
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn food(&self, id: &str) -> Option<&Food> {
        self.foods.iter().find(|f| f.id == id)
    }

    /// Register a new food
    pub async fn add_food(&mut self, draft: FoodDraft) -> FoodResult<Food> {
        if draft.name.trim().is_empty() {
            return Err(FoodError::Validation("name must not be empty".to_string()));
        }
        if draft.price < 0.0 {
            return Err(FoodError::Validation(
                "price must not be negative".to_string(),
            ));
        }

        let food = self.remote.insert_food(draft).await?;
        self.foods.insert(0, food.clone());
        Ok(food)
    }

    /// Update a food in place
    pub async fn update_food(&mut self, id: &str, patch: FoodPatch) -> FoodResult<Food> {
        if patch.is_empty() {
            return self
                .food(id)
                .cloned()
                .ok_or_else(|| FoodError::NotFound(id.to_string()));
        }

        let food = self.remote.update_food(id, &patch).await?;
        if let Some(slot) = self.foods.iter_mut().find(|f| f.id == id) {
            *slot = food.clone();
        }
        Ok(food)
    }

    /// Delete a food; any cart line referencing it goes too
    pub async fn delete_food(&mut self, id: &str) -> FoodResult<()> {
        self.remote.delete_food(id).await?;
        self.foods.retain(|f| f.id != id);
        if self.cart.iter().any(|c| c.food_id == id) {
            self.cart.retain(|c| c.food_id != id);
            self.persist_cart()?;
        }
        Ok(())
    }

    // --- cart -----------------------------------------------------------

    /// Add a quantity of a food to the cart, merging with an existing line
    pub fn add_to_cart(&mut self, food_id: &str, quantity: u32) -> FoodResult<()> {
        if quantity == 0 {
            return Ok(());
        }
        match self.cart.iter_mut().find(|c| c.food_id == food_id) {
            Some(line) => line.quantity += quantity,
            None => self.cart.push(CartItem {
                food_id: food_id.to_string(),
                quantity,
            }),
        }
        self.persist_cart()
    }

    /// Set a cart line's quantity; zero removes the line
    pub fn update_quantity(&mut self, food_id: &str, quantity: u32) -> FoodResult<()> {
        if quantity == 0 {
            self.cart.retain(|c| c.food_id != food_id);
        } else if let Some(line) = self.cart.iter_mut().find(|c| c.food_id == food_id) {
            line.quantity = quantity;
        }
        self.persist_cart()
    }

    /// Remove a cart line
    pub fn remove_from_cart(&mut self, food_id: &str) -> FoodResult<()> {
        self.cart.retain(|c| c.food_id != food_id);
        self.persist_cart()
    }

    /// Empty the cart
    pub fn clear_cart(&mut self) -> FoodResult<()> {
        self.cart.clear();
        self.persist_cart()
    }

    /// Cart lines joined against the food cache. Lines whose food no
    /// longer exists are skipped, not errors.
    pub fn cart_items(&self) -> Vec<CartEntry> {
        self.cart
            .iter()
            .filter_map(|line| {
                let food = self.food(&line.food_id)?;
                Some(CartEntry {
                    food: food.clone(),
                    quantity: line.quantity,
                })
            })
            .collect()
    }

    /// Current cart total at today's prices
    pub fn cart_total(&self) -> f64 {
        self.cart_items().iter().map(CartEntry::subtotal).sum()
    }

    fn persist_cart(&self) -> FoodResult<()> {
        self.store.save(keys::CART, &self.cart)?;
        Ok(())
    }

    // --- checkout -------------------------------------------------------

    /// Turn the cart into an order. The line items and the total are
    /// snapshots of the prices at this moment; the stored order never
    /// changes when foods are edited later.
    pub async fn checkout(&mut self) -> FoodResult<Order> {
        let entries = self.cart_items();
        if entries.is_empty() {
            return Err(FoodError::EmptyCart);
        }

        let items: Vec<OrderItem> = entries
            .iter()
            .map(|e| OrderItem {
                name: e.food.name.clone(),
                price: e.food.price,
                quantity: e.quantity,
                supermarkets: e.food.supermarkets.clone(),
            })
            .collect();
        let total: f64 = items.iter().map(OrderItem::subtotal).sum();
        let date = Local::now().format(ORDER_DATE_FORMAT).to_string();

        let order = self.remote.insert_order(items, total, date).await?;
        info!(order_id = %order.id, total = order.total, "order placed");

        self.orders.insert(0, order.clone());
        self.clear_cart()?;
        Ok(order)
    }

    // --- realtime -------------------------------------------------------

    /// Apply a pushed change to the food cache in place
    pub fn apply_food_change(&mut self, event: &ChangeEvent) {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(food) = event
                    .record
                    .clone()
                    .and_then(|v| serde_json::from_value::<FoodRow>(v).ok())
                    .map(Food::from)
                else {
                    warn!("unparseable food change record");
                    return;
                };
                match self.foods.iter_mut().find(|f| f.id == food.id) {
                    Some(slot) => *slot = food,
                    None => self.foods.insert(0, food),
                }
            }
            ChangeKind::Delete => {
                if let Some(id) = event
                    .old_record
                    .as_ref()
                    .and_then(|v| v.get("id"))
                    .map(id_from_value)
                {
                    self.foods.retain(|f| f.id != id);
                    self.cart.retain(|c| c.food_id != id);
                }
            }
        }
    }

    /// Apply a pushed change to the order cache in place
    pub fn apply_order_change(&mut self, event: &ChangeEvent) {
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(order) = event
                    .record
                    .clone()
                    .and_then(|v| serde_json::from_value::<Order>(v).ok())
                else {
                    warn!("unparseable order change record");
                    return;
                };
                match self.orders.iter_mut().find(|o| o.id == order.id) {
                    Some(slot) => *slot = order,
                    None => self.orders.insert(0, order),
                }
            }
            ChangeKind::Delete => {
                if let Some(id) = event
                    .old_record
                    .as_ref()
                    .and_then(|v| v.get("id"))
                    .map(id_from_value)
                {
                    self.orders.retain(|o| o.id != id);
                }
            }
        }
    }

    /// Subscribe to realtime changes of the user's foods
    pub async fn subscribe_foods(&self) -> FoodResult<Subscription> {
        self.remote.subscribe_foods().await
    }

    /// Subscribe to realtime changes of the user's orders
    pub async fn subscribe_orders(&self) -> FoodResult<Subscription> {
        self.remote.subscribe_orders().await
    }
}

/// Primary keys arrive as strings or numbers depending on the column type.
fn id_from_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
