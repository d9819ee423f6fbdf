use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Domain event handed to the activity-log collaborator after a
/// successful write. The feed itself lives outside this service; the
/// core only emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub entity_type: String,
    pub entity_id: String,
    pub action: ActivityAction,
    pub actor_id: Option<String>,
    /// Conventionally carries at least a display name for feed rendering.
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityAction::Created => write!(f, "created"),
            ActivityAction::Updated => write!(f, "updated"),
            ActivityAction::Deleted => write!(f, "deleted"),
        }
    }
}

pub trait ActivityNotifier: Send + Sync {
    fn record(&self, event: ActivityEvent);
}

/// Default notifier: structured tracing events. A deployment wires a real
/// feed writer in its place.
pub struct LogNotifier;

impl ActivityNotifier for LogNotifier {
    fn record(&self, event: ActivityEvent) {
        tracing::info!(
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            action = %event.action,
            actor_id = event.actor_id.as_deref().unwrap_or("anonymous"),
            metadata = %event.metadata,
            "activity recorded"
        );
    }
}
