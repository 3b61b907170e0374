//! Daily activity journal.
//!
//! Events go into one document per lab-local date. The day's document is
//! created on first use and events are added with an atomic array append, so
//! concurrent actions on the same day never overwrite each other.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};

use crate::error::StoreError;
use crate::models::{
    ActivityAction, ActivityEvent, Actor, DailyActivityLog, InventoryItem, ACTIVITY_LOG,
};
use crate::store::{DocumentStore, Patch};
use crate::utils::short_key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub action: ActivityAction,
    pub target: String,
    pub item_id: Option<String>,
    pub details: Option<String>,
}

impl ActivityEntry {
    pub fn new(action: ActivityAction, target: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            item_id: None,
            details: None,
        }
    }

    pub fn for_item(action: ActivityAction, item: &InventoryItem) -> Self {
        Self {
            action,
            target: item.name.clone(),
            item_id: Some(item.item_id.clone()),
            details: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<dyn DocumentStore>,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Appends one event to the log for `as_of`, creating that day's document if needed.
    pub async fn log(
        &self,
        as_of: NaiveDate,
        at: DateTime<Utc>,
        actor: &Actor,
        entry: ActivityEntry,
    ) -> Result<ActivityEvent, StoreError> {
        let event = ActivityEvent {
            key: short_key(),
            timestamp: at,
            user: actor.activity_name().to_string(),
            action: entry.action,
            target: entry.target,
            details: entry.details,
            item_id: entry.item_id,
        };

        let doc_id = DailyActivityLog::document_id(as_of);
        let created = self
            .store
            .create_if_not_exists(
                &doc_id,
                ACTIVITY_LOG,
                serde_json::to_value(DailyActivityLog::empty(as_of))?,
            )
            .await?;
        if created {
            debug!("opened activity log {}", doc_id);
        }

        self.store
            .patch(
                &doc_id,
                Patch::new()
                    .set_if_missing("events", serde_json::json!([]))
                    .append("events", vec![serde_json::to_value(&event)?]),
            )
            .await?;

        Ok(event)
    }

    /// Best-effort variant of [`log`](Self::log): failures are reported and dropped.
    pub async fn record(
        &self,
        as_of: NaiveDate,
        at: DateTime<Utc>,
        actor: &Actor,
        entry: ActivityEntry,
    ) -> Option<ActivityEvent> {
        let action = entry.action;
        match self.log(as_of, at, actor, entry).await {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("failed to record {} activity for {}: {}", action, as_of, e);
                None
            }
        }
    }

    pub async fn events_for(&self, date: NaiveDate) -> Result<Vec<ActivityEvent>, StoreError> {
        let doc = self
            .store
            .get(&DailyActivityLog::document_id(date))
            .await?;
        match doc {
            Some(doc) => Ok(doc.decode::<DailyActivityLog>()?.events),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn first_event_of_a_day_creates_exactly_one_document() {
        let store = Arc::new(MemoryStore::new());
        let logger = ActivityLogger::new(store.clone());
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let actor = Actor::user("Dana Reyes");

        for n in 0..3 {
            let entry = ActivityEntry::new(ActivityAction::AddNote, format!("item {}", n));
            logger
                .log(day(16), at, &actor, entry)
                .await
                .unwrap();
        }
        logger
            .log(day(17), at, &actor, ActivityEntry::new(ActivityAction::AddNote, "next day"))
            .await
            .unwrap();

        assert_eq!(store.count_of_type(ACTIVITY_LOG).await, 2);
        let events = logger.events_for(day(16)).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].target, "item 0");
        assert_eq!(events[2].target, "item 2");
        assert_eq!(logger.events_for(day(17)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn anonymous_actor_is_logged_as_unknown() {
        let store = Arc::new(MemoryStore::new());
        let logger = ActivityLogger::new(store);
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();

        let entry = ActivityEntry::new(ActivityAction::UpdateLocation, "Agar").details("Shelf B");
        let event = logger
            .log(day(16), at, &Actor::Anonymous, entry)
            .await
            .unwrap();

        assert_eq!(event.user, "Unknown");
        assert_eq!(event.details.as_deref(), Some("Shelf B"));
        assert_eq!(event.key.len(), 12);
    }

    #[tokio::test]
    async fn day_without_log_reads_as_empty() {
        let logger = ActivityLogger::new(Arc::new(MemoryStore::new()));
        assert!(logger.events_for(day(1)).await.unwrap().is_empty());
    }
}
