//! In-memory store implementations for tests and the local harness.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vulnwatch_model::{EventGroup, EventRecord, ScheduledRule};

use crate::store::{EventStore, RuleStore, RuleStoreError, StoreError};

/// Rule store backed by a map. Enforces watermark monotonicity.
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<Uuid, ScheduledRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, rule: ScheduledRule) {
        self.rules.write().unwrap().insert(rule.id, rule);
    }

    pub fn get(&self, id: Uuid) -> Option<ScheduledRule> {
        self.rules.read().unwrap().get(&id).cloned()
    }
}

#[async_trait::async_trait]
impl RuleStore for MemoryRuleStore {
    async fn load_rule(&self, id: Uuid) -> Result<ScheduledRule, RuleStoreError> {
        self.rules
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RuleStoreError::NotFound(id))
    }

    async fn advance_watermark(&self, id: Uuid, to: DateTime<Utc>) -> Result<(), RuleStoreError> {
        let mut rules = self.rules.write().unwrap();
        let rule = rules.get_mut(&id).ok_or(RuleStoreError::NotFound(id))?;
        // The watermark never moves backward.
        if to > rule.last_execution {
            rule.last_execution = to;
        }
        Ok(())
    }
}

/// Event store backed by per-project vectors in insertion order.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<Uuid, Vec<EventRecord>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, project_id: Uuid, event: EventRecord) {
        self.events
            .write()
            .unwrap()
            .entry(project_id)
            .or_default()
            .push(event);
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryEventStore {
    async fn events_since(
        &self,
        project_id: Uuid,
        group: EventGroup,
        include_suppressed: bool,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let events = self.events.read().unwrap();
        Ok(events
            .get(&project_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|e| e.group == group)
                    .filter(|e| e.occurred_at > since)
                    .filter(|e| include_suppressed || !e.suppressed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
