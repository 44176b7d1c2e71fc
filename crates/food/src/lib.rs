//! Food, cart and order subsystem
//!
//! Foods (with per-store price lists) and orders live in the backend;
//! the cart is transient and stays in the local store even when signed
//! in. Orders are created at checkout and immutable afterwards, and
//! spending statistics are computed over the order history.

pub mod error;
pub mod manager;
pub mod models;
pub mod remote;
pub mod stats;

pub use error::{FoodError, FoodResult};
pub use manager::FoodManager;
pub use models::{CartEntry, CartItem, Food, FoodDraft, FoodPatch, Order, OrderItem, StorePrice};
pub use remote::RemoteFoodStore;
