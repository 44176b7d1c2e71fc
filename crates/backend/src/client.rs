//! HTTP core shared by the auth client and the remote stores
//!
//! Wraps a `reqwest::Client` with the project URL and anon key, and
//! exposes the small slice of the relational REST API the application
//! uses: row selection with column filters, inserts returning the
//! created row, filtered updates and deletes.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use common::config::BackendConfig;

use crate::error::{BackendError, BackendResult};

/// Client for the hosted backend's HTTP APIs
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Backend configuration this client talks to
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Build a request carrying the api key and bearer headers
    ///
    /// Unauthenticated requests fall back to the anon key as bearer,
    /// which is what the backend expects for public endpoints.
    fn request(&self, method: Method, url: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let bearer = token.unwrap_or(&self.config.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {bearer}"))
            .header("X-Client-Info", &self.config.client_info)
    }

    /// Select rows from a table
    ///
    /// `query` holds PostgREST-style parameters, e.g.
    /// `("user_id", "eq.<uuid>")` or `("order", "date.asc")`.
    pub async fn select_rows<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        table: &str,
        query: &[(String, String)],
    ) -> BackendResult<Vec<T>> {
        debug!("selecting rows from {}", table);
        let response = self
            .request(Method::GET, &self.config.rest_url(table), token)
            .query(query)
            .send()
            .await?;

        Self::json_body(response).await
    }

    /// Insert a row and return the created representation
    pub async fn insert_row<T: DeserializeOwned, B: Serialize>(
        &self,
        token: Option<&str>,
        table: &str,
        body: &B,
    ) -> BackendResult<T> {
        debug!("inserting row into {}", table);
        let response = self
            .request(Method::POST, &self.config.rest_url(table), token)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let mut rows: Vec<T> = Self::json_body(response).await?;
        rows.drain(..).next().ok_or(BackendError::Api {
            status: 200,
            message: "insert returned no representation".to_string(),
        })
    }

    /// Update rows matching the query and return the new representations
    pub async fn update_rows<T: DeserializeOwned, B: Serialize>(
        &self,
        token: Option<&str>,
        table: &str,
        query: &[(String, String)],
        body: &B,
    ) -> BackendResult<Vec<T>> {
        debug!("updating rows in {}", table);
        let response = self
            .request(Method::PATCH, &self.config.rest_url(table), token)
            .header("Prefer", "return=representation")
            .query(query)
            .json(body)
            .send()
            .await?;

        Self::json_body(response).await
    }

    /// Delete rows matching the query
    pub async fn delete_rows(
        &self,
        token: Option<&str>,
        table: &str,
        query: &[(String, String)],
    ) -> BackendResult<()> {
        debug!("deleting rows from {}", table);
        let response = self
            .request(Method::DELETE, &self.config.rest_url(table), token)
            .query(query)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// POST against the auth API
    pub(crate) async fn auth_post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
        body: &B,
    ) -> BackendResult<T> {
        let url = format!("{}{}", self.config.auth_url(), path);
        let response = self
            .request(Method::POST, &url, token)
            .query(query)
            .json(body)
            .send()
            .await?;

        Self::json_body(response).await
    }

    /// POST against the auth API, discarding any response body
    pub(crate) async fn auth_post_empty(&self, path: &str, token: Option<&str>) -> BackendResult<()> {
        let url = format!("{}{}", self.config.auth_url(), path);
        let response = self
            .request(Method::POST, &url, token)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// GET against the auth API
    pub(crate) async fn auth_get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> BackendResult<T> {
        let url = format!("{}{}", self.config.auth_url(), path);
        let response = self.request(Method::GET, &url, token).send().await?;
        Self::json_body(response).await
    }

    /// Check that the backend is reachable
    pub async fn health_check(&self) -> BackendResult<bool> {
        let url = format!("{}/health", self.config.auth_url());
        let response = self.request(Method::GET, &url, None).send().await?;
        Ok(response.status().is_success())
    }

    async fn json_body<T: DeserializeOwned>(response: reqwest::Response) -> BackendResult<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// Extract a readable message from an error response body
    async fn error_from_response(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["message", "error_description", "msg", "error"]
                    .iter()
                    .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or(body);

        BackendError::Api { status, message }
    }
}
