//! Remote food and order store
//!
//! CRUD against the backend's `foods` and `orders` tables, scoped to
//! the signed-in user. Orders are insert-only; once created they are
//! never updated.

use tracing::warn;

use backend::auth::Session;
use backend::{AuthClient, BackendClient, BackendError, RealtimeClient, Subscription};

use crate::error::{FoodError, FoodResult};
use crate::models::{Food, FoodDraft, FoodPatch, FoodRow, NewFoodRow, NewOrderRow, Order, OrderItem};

const FOODS_TABLE: &str = "foods";
const ORDERS_TABLE: &str = "orders";

/// Remote food and order store
#[derive(Clone)]
pub struct RemoteFoodStore {
    client: BackendClient,
    auth: AuthClient,
    realtime: RealtimeClient,
}

impl RemoteFoodStore {
    /// Create a new remote food store
    pub fn new(client: BackendClient, auth: AuthClient) -> Self {
        let realtime = RealtimeClient::new(client.config().clone());
        Self {
            client,
            auth,
            realtime,
        }
    }

    /// Session for a read; `None` means signed out, which reads treat
    /// as empty lists rather than an error.
    async fn read_session(&self) -> FoodResult<Option<Session>> {
        let Some(session) = self.auth.current_session().await? else {
            return Ok(None);
        };
        if let Err(e) = self.auth.ensure_user_row().await {
            warn!("could not ensure users row: {}", e);
        }
        Ok(Some(session))
    }

    /// Session for a write; writes require sign-in and a users row.
    async fn write_session(&self) -> FoodResult<Session> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;
        self.auth.ensure_user_row().await?;
        Ok(session)
    }

    fn scope(session: &Session) -> (String, String) {
        ("user_id".to_string(), format!("eq.{}", session.user.id))
    }

    /// Fetch the user's foods, newest first
    pub async fn fetch_foods(&self) -> FoodResult<Vec<Food>> {
        let Some(session) = self.read_session().await? else {
            return Ok(Vec::new());
        };

        let rows: Vec<FoodRow> = self
            .client
            .select_rows(
                Some(&session.access_token),
                FOODS_TABLE,
                &[
                    ("select".to_string(), "*".to_string()),
                    Self::scope(&session),
                    ("order".to_string(), "created_at.desc".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(Food::from).collect())
    }

    /// Fetch the user's order history, newest first
    pub async fn fetch_orders(&self) -> FoodResult<Vec<Order>> {
        let Some(session) = self.read_session().await? else {
            return Ok(Vec::new());
        };

        let orders: Vec<Order> = self
            .client
            .select_rows(
                Some(&session.access_token),
                ORDERS_TABLE,
                &[
                    ("select".to_string(), "*".to_string()),
                    Self::scope(&session),
                    ("order".to_string(), "created_at.desc".to_string()),
                ],
            )
            .await?;

        Ok(orders)
    }

    /// Register a new food and return the created row
    pub async fn insert_food(&self, draft: FoodDraft) -> FoodResult<Food> {
        let session = self.write_session().await?;

        let body = NewFoodRow::from_draft(session.user.id, draft);
        let row: FoodRow = self
            .client
            .insert_row(Some(&session.access_token), FOODS_TABLE, &body)
            .await?;

        Ok(Food::from(row))
    }

    /// Apply a partial update to a food and return the new row
    pub async fn update_food(&self, id: &str, patch: &FoodPatch) -> FoodResult<Food> {
        let session = self.write_session().await?;

        let rows: Vec<FoodRow> = self
            .client
            .update_rows(
                Some(&session.access_token),
                FOODS_TABLE,
                &[("id".to_string(), format!("eq.{id}")), Self::scope(&session)],
                patch,
            )
            .await?;

        rows.into_iter()
            .next()
            .map(Food::from)
            .ok_or_else(|| FoodError::NotFound(id.to_string()))
    }

    /// Delete a food
    pub async fn delete_food(&self, id: &str) -> FoodResult<()> {
        let session = self.write_session().await?;

        self.client
            .delete_rows(
                Some(&session.access_token),
                FOODS_TABLE,
                &[("id".to_string(), format!("eq.{id}")), Self::scope(&session)],
            )
            .await?;

        Ok(())
    }

    /// Insert a completed order and return the stored row
    pub async fn insert_order(
        &self,
        items: Vec<OrderItem>,
        total: f64,
        date: String,
    ) -> FoodResult<Order> {
        let session = self.write_session().await?;

        let body = NewOrderRow {
            user_id: session.user.id,
            items,
            total,
            date,
        };
        let order: Order = self
            .client
            .insert_row(Some(&session.access_token), ORDERS_TABLE, &body)
            .await?;

        Ok(order)
    }

    /// Subscribe to realtime changes of the user's foods
    pub async fn subscribe_foods(&self) -> FoodResult<Subscription> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;

        Ok(self.realtime.subscribe(FOODS_TABLE, session.user.id).await?)
    }

    /// Subscribe to realtime changes of the user's orders
    pub async fn subscribe_orders(&self) -> FoodResult<Subscription> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;

        Ok(self
            .realtime
            .subscribe(ORDERS_TABLE, session.user.id)
            .await?)
    }
}
