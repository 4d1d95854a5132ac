use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::config::WebhookEndpoint;
use crate::db::connection::DbPool;
use crate::notifiers::{read_backup_full, Notifier};

pub struct WebhookNotifier {
    db: DbPool,
    endpoints: Vec<WebhookEndpoint>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(db: DbPool, endpoints: Vec<WebhookEndpoint>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            db,
            endpoints,
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn backup_report(&self, backup_id: &str) -> anyhow::Result<()> {
        let backup = read_backup_full(&self.db, backup_id).await?;
        let payload = json!({
            "event": "backup_report",
            "payload": backup,
        });

        // One endpoint failing must not stop the others.
        for endpoint in &self.endpoints {
            let result = self
                .client
                .post(&endpoint.url)
                .header("X-Webhook-Token", &endpoint.token)
                .json(&payload)
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(endpoint = %endpoint.name, "backup report webhook delivered");
                }
                Ok(resp) => {
                    tracing::warn!(
                        endpoint = %endpoint.name,
                        status = %resp.status(),
                        "backup report webhook rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %endpoint.name,
                        error = %e,
                        "backup report webhook failed"
                    );
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }

    async fn health(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
