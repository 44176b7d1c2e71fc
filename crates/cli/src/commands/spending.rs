use anyhow::Result;
use clap::Subcommand;

use food::stats::{monthly_spend, price_changes, weekly_spend};

use super::{context, food_manager};

#[derive(Subcommand)]
pub enum SpendingAction {
    /// Spend per calendar month
    Monthly,
    /// Spend per ISO week
    Weekly,
    /// Price drift per item across the order history
    Changes,
}

pub async fn run(action: SpendingAction) -> Result<()> {
    let ctx = context()?;
    let mut manager = food_manager(&ctx);
    manager.refresh().await?;
    let orders = manager.orders();

    match action {
        SpendingAction::Monthly => {
            for month in monthly_spend(orders) {
                println!(
                    "{}  {:>10.2}  ({} orders)",
                    month.month, month.total, month.order_count
                );
            }
        }
        SpendingAction::Weekly => {
            for week in weekly_spend(orders) {
                println!(
                    "{}  {:>10.2}  ({} orders)",
                    week.week, week.total, week.order_count
                );
            }
        }
        SpendingAction::Changes => {
            let changes = price_changes(orders);
            if changes.is_empty() {
                println!("no price changes observed");
            }
            for change in changes {
                println!(
                    "{}  {:.2} -> {:.2}  ({:+.2})",
                    change.name,
                    change.first_price,
                    change.last_price,
                    change.diff()
                );
            }
        }
    }

    Ok(())
}
