use async_trait::async_trait;
use std::sync::Mutex;

use crate::notifiers::Notifier;

/// Test double recording every delivered report.
pub struct MockNotifier {
    name: String,
    fail_send: bool,
    fail_health: bool,
    reports: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_send: false,
            fail_health: false,
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn failing_health(mut self) -> Self {
        self.fail_health = true;
        self
    }

    pub fn reported_backup_ids(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn backup_report(&self, backup_id: &str) -> anyhow::Result<()> {
        if self.fail_send {
            anyhow::bail!("mock notification failure");
        }
        self.reports.lock().unwrap().push(backup_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn health(&self) -> anyhow::Result<()> {
        if self.fail_health {
            anyhow::bail!("mock notifier unhealthy");
        }
        Ok(())
    }
}
