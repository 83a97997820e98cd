use reqwest::Client;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::alerts::AlertEvent;

/// Forwards alert transitions to an external webhook as JSON.
///
/// Without a webhook the task only drains the channel (the monitor already
/// logs every transition). The task ends when the monitor is dropped.
pub fn spawn_alert_forwarder(
    mut events: broadcast::Receiver<AlertEvent>,
    webhook_url: Option<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = match &webhook_url {
            Some(_) => match Client::builder().timeout(Duration::from_secs(5)).build() {
                Ok(client) => Some(client),
                Err(e) => {
                    error!("Failed to build alert webhook client: {}", e);
                    None
                }
            },
            None => None,
        };

        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Alert forwarder lagged, {} events dropped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let (Some(client), Some(url)) = (&client, &webhook_url) else {
                continue;
            };

            match client.post(url).json(&event).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Delivered {} alert for scope {}", event.kind(), event.scope());
                }
                Ok(response) => {
                    warn!("Alert webhook returned {}", response.status());
                }
                Err(e) => {
                    warn!("Alert webhook delivery failed: {}", e);
                }
            }
        }

        debug!("Alert forwarder stopped");
    })
}
