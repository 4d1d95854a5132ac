use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::state::AppState;

pub const HEALTH_UP: &str = "UP";
pub const HEALTH_DOWN: &str = "DOWN";

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<BTreeMap<String, ComponentStatus>>,
}

impl ComponentStatus {
    fn leaf(up: bool) -> Self {
        Self {
            status: status_str(up).to_string(),
            components: None,
        }
    }

    fn group(children: BTreeMap<String, ComponentStatus>) -> Self {
        let up = children.values().all(|c| c.status == HEALTH_UP);
        Self {
            status: status_str(up).to_string(),
            components: Some(children),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub details: BTreeMap<String, ComponentStatus>,
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        self.status == HEALTH_UP
    }
}

/// Check every collaborator in turn: the entity store, each notifier, each
/// drive and each data source. A failing check marks only its own component
/// DOWN and never stops the remaining checks. Pure read, no side effects.
pub async fn health_report(state: &AppState) -> HealthReport {
    let mut details = BTreeMap::new();

    let db_up = match state
        .with_db(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database health check failed");
            false
        }
    };
    details.insert("database".to_string(), ComponentStatus::leaf(db_up));

    let mut notifier_children = BTreeMap::new();
    for notifier in &state.notifiers {
        let up = match notifier.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(notifier = notifier.name(), error = %e, "notifier health check failed");
                false
            }
        };
        notifier_children.insert(notifier.name().to_string(), ComponentStatus::leaf(up));
    }
    if !notifier_children.is_empty() {
        details.insert(
            "notifiers".to_string(),
            ComponentStatus::group(notifier_children),
        );
    }

    let mut drive_children = BTreeMap::new();
    for drive in &state.drives {
        let up = match drive.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(drive = drive.label(), error = %e, "drive health check failed");
                false
            }
        };
        drive_children.insert(drive.label().to_string(), ComponentStatus::leaf(up));
    }
    details.insert("drives".to_string(), ComponentStatus::group(drive_children));

    let mut source_children = BTreeMap::new();
    for dumper in &state.dumpers {
        let up = match dumper.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(source = dumper.label(), error = %e, "data source health check failed");
                false
            }
        };
        source_children.insert(dumper.label().to_string(), ComponentStatus::leaf(up));
    }
    details.insert(
        "data_sources".to_string(),
        ComponentStatus::group(source_children),
    );

    let up = details.values().all(|c| c.status == HEALTH_UP);
    HealthReport {
        status: status_str(up).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        details,
    }
}

fn status_str(up: bool) -> &'static str {
    if up {
        HEALTH_UP
    } else {
        HEALTH_DOWN
    }
}
