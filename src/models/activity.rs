use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const ACTIVITY_LOG: &str = "activityLog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    CreateItem,
    ReceiveStock,
    UpdateStock,
    RequestReorder,
    RequestRepair,
    ApproveRequest,
    UpdateEquipmentStatus,
    UpdateLocation,
    UpdateOwner,
    AddNote,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::CreateItem => "create_item",
            ActivityAction::ReceiveStock => "receive_stock",
            ActivityAction::UpdateStock => "update_stock",
            ActivityAction::RequestReorder => "request_reorder",
            ActivityAction::RequestRepair => "request_repair",
            ActivityAction::ApproveRequest => "approve_request",
            ActivityAction::UpdateEquipmentStatus => "update_equipment_status",
            ActivityAction::UpdateLocation => "update_location",
            ActivityAction::UpdateOwner => "update_owner",
            ActivityAction::AddNote => "add_note",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    #[serde(rename = "_key")]
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: ActivityAction,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

/// One journal document per lab-local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivityLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub events: Vec<ActivityEvent>,
}

impl DailyActivityLog {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            events: Vec::new(),
        }
    }

    pub fn document_id(date: NaiveDate) -> String {
        format!("{}-{}", ACTIVITY_LOG, date.format("%Y-%m-%d"))
    }
}
