//! Realtime push channel
//!
//! Connects to the backend's websocket endpoint and joins a Phoenix
//! channel configured for row-level `postgres_changes` on one table,
//! filtered to the current user's rows. Decoded change events are
//! delivered on an unbounded channel; the socket task sends heartbeats
//! and is aborted when the subscription is dropped.

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::config::BackendConfig;

use crate::error::{BackendError, BackendResult};

/// Heartbeat period expected by the server.
const HEARTBEAT_SECS: u64 = 30;

/// Kind of row-level change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change pushed by the backend
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: String,
    /// New row for inserts and updates
    pub record: Option<Value>,
    /// Previous row for updates and deletes
    pub old_record: Option<Value>,
}

/// Wire frame of the channel protocol
#[derive(Debug, Serialize, Deserialize)]
struct ChannelMessage {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref")]
    message_ref: Option<String>,
}

/// Client for the realtime API
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    config: BackendConfig,
}

impl RealtimeClient {
    /// Create a new realtime client
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    /// Subscribe to changes of one user's rows in a table
    pub async fn subscribe(&self, table: &str, user_id: Uuid) -> BackendResult<Subscription> {
        let url = self.config.realtime_url();
        let (socket, _response) = connect_async(&url)
            .await
            .map_err(|e| BackendError::Realtime(e.to_string()))?;

        // Topic names are unique per user and join so a re-subscribe
        // never collides with a dangling server-side channel.
        let topic = format!(
            "realtime:{}-changes-{}-{}",
            table,
            user_id,
            Utc::now().timestamp_millis()
        );

        let join = ChannelMessage {
            topic: topic.clone(),
            event: "phx_join".to_string(),
            payload: join_payload(table, user_id),
            message_ref: Some("1".to_string()),
        };

        info!("joining realtime channel for table {}", table);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let table = table.to_string();

        let task = tokio::spawn(async move {
            let (mut sink, mut stream) = socket.split();

            let join_text = match serde_json::to_string(&join) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode join message: {}", e);
                    return;
                }
            };
            if let Err(e) = sink.send(Message::text(join_text)).await {
                warn!("realtime join failed: {}", e);
                return;
            }

            let mut heartbeat =
                tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_SECS));
            heartbeat.tick().await; // first tick fires immediately
            let mut heartbeat_ref: u64 = 2;

            loop {
                tokio::select! {
                    incoming = stream.next() => {
                        let message = match incoming {
                            Some(Ok(message)) => message,
                            Some(Err(e)) => {
                                warn!("realtime socket error: {}", e);
                                break;
                            }
                            None => {
                                debug!("realtime socket closed");
                                break;
                            }
                        };

                        let Message::Text(text) = message else { continue };
                        let Ok(frame) = serde_json::from_str::<ChannelMessage>(&text) else {
                            continue;
                        };

                        if frame.event == "phx_reply"
                            && frame.payload.get("status").and_then(Value::as_str)
                                == Some("error")
                        {
                            warn!("realtime channel rejected: {}", frame.payload);
                            continue;
                        }

                        if let Some(event) = decode_change(&frame, &table) {
                            if events_tx.send(event).is_err() {
                                // Receiver dropped; stop the socket task.
                                break;
                            }
                        }
                    }
                    _ = heartbeat.tick() => {
                        let beat = ChannelMessage {
                            topic: "phoenix".to_string(),
                            event: "heartbeat".to_string(),
                            payload: json!({}),
                            message_ref: Some(heartbeat_ref.to_string()),
                        };
                        heartbeat_ref += 1;
                        let Ok(text) = serde_json::to_string(&beat) else { continue };
                        if let Err(e) = sink.send(Message::text(text)).await {
                            warn!("realtime heartbeat failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Subscription {
            events: events_rx,
            task,
        })
    }
}

/// Channel join payload asking for all events on the user's rows
fn join_payload(table: &str, user_id: Uuid) -> Value {
    json!({
        "config": {
            "postgres_changes": [{
                "event": "*",
                "schema": "public",
                "table": table,
                "filter": format!("user_id=eq.{user_id}"),
            }]
        }
    })
}

/// Decode a `postgres_changes` frame into a change event
fn decode_change(frame: &ChannelMessage, table: &str) -> Option<ChangeEvent> {
    if frame.event != "postgres_changes" {
        return None;
    }

    let data = frame.payload.get("data")?;
    let kind = match data.get("type").and_then(Value::as_str)? {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        other => {
            debug!("ignoring unknown change type: {}", other);
            return None;
        }
    };

    Some(ChangeEvent {
        kind,
        table: table.to_string(),
        record: data.get("record").filter(|v| !v.is_null()).cloned(),
        old_record: data.get("old_record").filter(|v| !v.is_null()).cloned(),
    })
}

/// Handle on an active realtime subscription
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Next change event, or `None` once the channel is gone
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Tear down the subscription
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
