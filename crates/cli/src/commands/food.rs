use anyhow::{Result, bail};
use clap::Subcommand;

use food::{FoodDraft, FoodManager, FoodPatch, StorePrice};

use super::{context, food_manager};

#[derive(Subcommand)]
pub enum FoodAction {
    /// Register a food
    Add {
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "pc")]
        unit: String,
        /// Per-store price, "store=price", repeatable
        #[arg(long = "store")]
        stores: Vec<String>,
    },
    /// List foods
    List,
    /// Delete a food
    Rm { id: String },
    /// Change a food's price
    Price { id: String, price: f64 },
}

#[derive(Subcommand)]
pub enum CartAction {
    /// Put a quantity of a food in the cart
    Add {
        food_id: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Take a food out of the cart
    Rm { food_id: String },
    /// Show the cart
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
pub enum OrderAction {
    /// Turn the cart into an order
    Checkout,
    /// List past orders
    List,
}

fn parse_store_price(raw: &str) -> Result<StorePrice> {
    let Some((name, price)) = raw.split_once('=') else {
        bail!("expected \"store=price\", got {raw:?}");
    };
    Ok(StorePrice {
        name: name.trim().to_string(),
        price: price.trim().parse()?,
    })
}

async fn loaded_manager() -> Result<FoodManager> {
    let ctx = context()?;
    let mut manager = food_manager(&ctx);
    manager.refresh().await?;
    Ok(manager)
}

pub async fn run_food(action: FoodAction) -> Result<()> {
    let mut manager = loaded_manager().await?;

    match action {
        FoodAction::Add {
            name,
            category,
            price,
            unit,
            stores,
        } => {
            let supermarkets = stores
                .iter()
                .map(|s| parse_store_price(s))
                .collect::<Result<Vec<_>>>()?;
            let food = manager
                .add_food(FoodDraft {
                    name,
                    category,
                    price,
                    unit,
                    image: None,
                    supermarkets,
                })
                .await?;
            println!("registered {} ({})", food.name, food.id);
        }
        FoodAction::List => {
            if manager.foods().is_empty() {
                println!("no foods");
            }
            for food in manager.foods() {
                println!(
                    "{}  {:.2}/{}  {}  ({})",
                    food.name, food.price, food.unit, food.category, food.id
                );
                for store in &food.supermarkets {
                    println!("    {}: {:.2}", store.name, store.price);
                }
            }
        }
        FoodAction::Rm { id } => {
            manager.delete_food(&id).await?;
            println!("deleted food {id}");
        }
        FoodAction::Price { id, price } => {
            let patch = FoodPatch {
                price: Some(price),
                ..Default::default()
            };
            let food = manager.update_food(&id, patch).await?;
            println!("{} now costs {:.2}/{}", food.name, food.price, food.unit);
        }
    }

    Ok(())
}

pub async fn run_cart(action: CartAction) -> Result<()> {
    let mut manager = loaded_manager().await?;

    match action {
        CartAction::Add { food_id, quantity } => {
            if manager.food(&food_id).is_none() {
                bail!("no food with id {food_id}");
            }
            manager.add_to_cart(&food_id, quantity)?;
            println!("cart total: {:.2}", manager.cart_total());
        }
        CartAction::Rm { food_id } => {
            manager.remove_from_cart(&food_id)?;
            println!("cart total: {:.2}", manager.cart_total());
        }
        CartAction::Show => {
            let entries = manager.cart_items();
            if entries.is_empty() {
                println!("cart is empty");
                return Ok(());
            }
            for entry in &entries {
                println!(
                    "{} x{}  {:.2}",
                    entry.food.name,
                    entry.quantity,
                    entry.subtotal()
                );
            }
            println!("total: {:.2}", manager.cart_total());
        }
        CartAction::Clear => {
            manager.clear_cart()?;
            println!("cart emptied");
        }
    }

    Ok(())
}

pub async fn run_order(action: OrderAction) -> Result<()> {
    let mut manager = loaded_manager().await?;

    match action {
        OrderAction::Checkout => {
            let order = manager.checkout().await?;
            println!("order {} placed, total {:.2}", order.id, order.total);
        }
        OrderAction::List => {
            if manager.orders().is_empty() {
                println!("no orders");
            }
            for order in manager.orders() {
                println!("{}  total {:.2}  ({})", order.date, order.total, order.id);
                for item in &order.items {
                    println!("    {} x{}  {:.2}", item.name, item.quantity, item.subtotal());
                }
            }
        }
    }

    Ok(())
}
