//! Action History
//!
//! TigerStyle: Append-only record of attempted renames, fed back to the host
//! as LLM context ("I tried to rename the group to X").

use crate::host::ActionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Action record ID prefix for readability
pub const ACTION_ID_PREFIX: &str = "act_";

/// Records kept in memory before the oldest are dropped
pub const ACTION_LOG_COUNT_MAX: usize = 1_000;

// =============================================================================
// Types
// =============================================================================

/// One attempted action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    /// Unique record ID
    pub id: String,
    /// When the action finished
    pub recorded_at: DateTime<Utc>,
    /// Component that performed it
    pub action_name: String,
    pub platform: String,
    pub group_id: Option<String>,
    /// Human-readable summary for future prompts
    pub display: String,
    /// Whether the host should include this in prompts
    pub build_into_prompt: bool,
    /// Whether the action counts as carried out
    pub done: bool,
}

impl ActionRecord {
    pub fn new(
        action_name: &str,
        platform: &str,
        group_id: Option<&str>,
        display: String,
        done: bool,
    ) -> Self {
        Self {
            id: format!("{}{}", ACTION_ID_PREFIX, &Uuid::new_v4().simple().to_string()[..8]),
            recorded_at: Utc::now(),
            action_name: action_name.to_string(),
            platform: platform.to_string(),
            group_id: group_id.map(str::to_string),
            display,
            build_into_prompt: true,
            done,
        }
    }
}

// =============================================================================
// In-memory Store
// =============================================================================

/// Bounded in-memory action history
#[derive(Debug, Default, Clone)]
pub struct ActionLog {
    records: Arc<RwLock<Vec<ActionRecord>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first
    pub async fn records(&self) -> Vec<ActionRecord> {
        self.records.read().await.clone()
    }

    /// Records for one group, oldest first
    pub async fn records_for_group(&self, platform: &str, group_id: &str) -> Vec<ActionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.platform == platform && r.group_id.as_deref() == Some(group_id))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ActionStore for ActionLog {
    async fn store_action_info(&self, record: ActionRecord) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        if records.len() >= ACTION_LOG_COUNT_MAX {
            let overflow = records.len() + 1 - ACTION_LOG_COUNT_MAX;
            records.drain(..overflow);
        }

        tracing::debug!(id = %record.id, display = %record.display, done = record.done, "Stored action record");
        records.push(record);

        debug_assert!(records.len() <= ACTION_LOG_COUNT_MAX);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
