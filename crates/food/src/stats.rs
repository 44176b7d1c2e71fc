//! Spending statistics
//!
//! Pure functions over the order history: monthly and weekly spend
//! summaries and per-item price drift between the first and the last
//! time an item was ordered.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::models::Order;

/// `Order::date` as written at checkout.
const ORDER_DATE_FORMAT: &str = "%Y年%m月%d日 %H:%M:%S";

/// Spend in one calendar month
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySpend {
    /// `YYYY-MM`
    pub month: String,
    pub total: f64,
    pub order_count: usize,
}

/// Spend in one ISO week
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySpend {
    /// `YYYY-Www`
    pub week: String,
    pub total: f64,
    pub order_count: usize,
}

/// Price drift of one item across the order history
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub name: String,
    pub first_price: f64,
    pub last_price: f64,
}

impl PriceChange {
    pub fn diff(&self) -> f64 {
        self.last_price - self.first_price
    }
}

/// Day an order was placed. Falls back to `created_at` when the
/// localized date string does not parse.
fn order_day(order: &Order) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(&order.date, ORDER_DATE_FORMAT)
        .map(|dt| dt.date())
        .ok()
        .or_else(|| order.created_at.map(|ts| ts.date_naive()))
}

/// Total spend per calendar month, newest month first. Orders whose
/// date cannot be resolved are left out.
pub fn monthly_spend(orders: &[Order]) -> Vec<MonthlySpend> {
    let mut buckets: HashMap<String, (f64, usize)> = HashMap::new();
    for order in orders {
        let Some(day) = order_day(order) else { continue };
        let key = format!("{:04}-{:02}", day.year(), day.month());
        let slot = buckets.entry(key).or_default();
        slot.0 += order.total;
        slot.1 += 1;
    }

    let mut months: Vec<MonthlySpend> = buckets
        .into_iter()
        .map(|(month, (total, order_count))| MonthlySpend {
            month,
            total,
            order_count,
        })
        .collect();
    months.sort_by(|a, b| b.month.cmp(&a.month));
    months
}

/// Total spend per ISO week, newest week first
pub fn weekly_spend(orders: &[Order]) -> Vec<WeeklySpend> {
    let mut buckets: HashMap<String, (f64, usize)> = HashMap::new();
    for order in orders {
        let Some(day) = order_day(order) else { continue };
        let week = day.iso_week();
        let key = format!("{:04}-W{:02}", week.year(), week.week());
        let slot = buckets.entry(key).or_default();
        slot.0 += order.total;
        slot.1 += 1;
    }

    let mut weeks: Vec<WeeklySpend> = buckets
        .into_iter()
        .map(|(week, (total, order_count))| WeeklySpend {
            week,
            total,
            order_count,
        })
        .collect();
    weeks.sort_by(|a, b| b.week.cmp(&a.week));
    weeks
}

/// Per-item price drift: the earliest observed price against the
/// latest, for items ordered more than once at different prices.
/// Sorted by the size of the change, biggest first.
///
/// Expects orders newest-first, as the stores return them.
pub fn price_changes(orders: &[Order]) -> Vec<PriceChange> {
    // Walk oldest to newest so first-seen really is the first order.
    let mut first: HashMap<String, f64> = HashMap::new();
    let mut last: HashMap<String, f64> = HashMap::new();
    for order in orders.iter().rev() {
        for item in &order.items {
            first.entry(item.name.clone()).or_insert(item.price);
            last.insert(item.name.clone(), item.price);
        }
    }

    let mut changes: Vec<PriceChange> = first
        .into_iter()
        .filter_map(|(name, first_price)| {
            let last_price = *last.get(&name)?;
            if (last_price - first_price).abs() < f64::EPSILON {
                return None;
            }
            Some(PriceChange {
                name,
                first_price,
                last_price,
            })
        })
        .collect();
    changes.sort_by(|a, b| {
        b.diff()
            .abs()
            .partial_cmp(&a.diff().abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;

    fn order(id: &str, date: &str, total: f64, items: Vec<OrderItem>) -> Order {
        Order {
            id: id.to_string(),
            items,
            total,
            date: date.to_string(),
            created_at: None,
        }
    }

    fn item(name: &str, price: f64) -> OrderItem {
        OrderItem {
            name: name.to_string(),
            price,
            quantity: 1,
            supermarkets: vec![],
        }
    }

    #[test]
    fn test_monthly_spend_buckets_and_sorts_newest_first() {
        let orders = vec![
            order("o3", "2026年09月02日 09:00:00", 5.0, vec![]),
            order("o2", "2026年08月20日 18:30:00", 7.0, vec![]),
            order("o1", "2026年08月01日 12:00:00", 3.0, vec![]),
        ];

        let months = monthly_spend(&orders);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2026-09");
        assert_eq!(months[0].order_count, 1);
        assert_eq!(months[1].month, "2026-08");
        assert!((months[1].total - 10.0).abs() < f64::EPSILON);
        assert_eq!(months[1].order_count, 2);
    }

    #[test]
    fn test_unparseable_date_without_created_at_is_skipped() {
        let orders = vec![
            order("o1", "not a date", 9.0, vec![]),
            order("o2", "2026年08月01日 12:00:00", 3.0, vec![]),
        ];

        let months = monthly_spend(&orders);
        assert_eq!(months.len(), 1);
        assert!((months[0].total - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weekly_spend_uses_iso_weeks() {
        // Monday 2026-08-24 and Sunday 2026-08-30 share ISO week 35.
        let orders = vec![
            order("o2", "2026年08月30日 10:00:00", 4.0, vec![]),
            order("o1", "2026年08月24日 10:00:00", 6.0, vec![]),
        ];

        let weeks = weekly_spend(&orders);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].week, "2026-W35");
        assert!((weeks[0].total - 10.0).abs() < f64::EPSILON);
        assert_eq!(weeks[0].order_count, 2);
    }

    #[test]
    fn test_price_changes_compare_first_and_last_order() {
        // Newest first, as fetch_orders returns them.
        let orders = vec![
            order(
                "o3",
                "2026年08月30日 10:00:00",
                0.0,
                vec![item("milk", 2.1), item("eggs", 3.0)],
            ),
            order(
                "o2",
                "2026年08月20日 10:00:00",
                0.0,
                vec![item("milk", 1.8)],
            ),
            order(
                "o1",
                "2026年08月10日 10:00:00",
                0.0,
                vec![item("milk", 1.5), item("eggs", 3.0)],
            ),
        ];

        let changes = price_changes(&orders);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "milk");
        assert!((changes[0].first_price - 1.5).abs() < f64::EPSILON);
        assert!((changes[0].last_price - 2.1).abs() < f64::EPSILON);
        assert!((changes[0].diff() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_biggest_change_sorts_first() {
        let orders = vec![
            order(
                "o2",
                "2026年08月30日 10:00:00",
                0.0,
                vec![item("milk", 1.6), item("beef", 12.0)],
            ),
            order(
                "o1",
                "2026年08月10日 10:00:00",
                0.0,
                vec![item("milk", 1.5), item("beef", 9.0)],
            ),
        ];

        let changes = price_changes(&orders);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].name, "beef");
        assert_eq!(changes[1].name, "milk");
    }
}
