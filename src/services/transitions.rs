//! Item state transitions.
//!
//! `plan` checks a transition against the item as last read and turns it
//! into a store patch plus the activity entry describing it. Nothing here
//! touches the store, so every rule can be exercised directly.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::activity::ActivityEntry;
use super::status::{derive_status, reorder_quantity};
use crate::error::{InventoryError, InventoryResult};
use crate::models::{
    ActivityAction, EquipmentStatus, InventoryItem, ItemStatus, MemberRef, StockLevels,
};
use crate::store::Patch;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Receive { quantity: u32 },
    UpdateStock { stock: u32 },
    RequestReorder,
    RequestRepair { issue: String },
    Approve,
    SetEquipmentStatus(EquipmentStatus),
    UpdateLocation(String),
    UpdateOwner(Option<MemberRef>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub patch: Patch,
    pub activity: ActivityEntry,
}

fn timestamp(at: DateTime<Utc>) -> Value {
    json!(at)
}

fn stock_levels(item: &InventoryItem, what: &str) -> InventoryResult<StockLevels> {
    item.stock_levels().ok_or_else(|| {
        InventoryError::precondition(format!(
            "{} is equipment and has no stock to {}",
            item.item_id, what
        ))
    })
}

fn require_equipment(item: &InventoryItem, what: &str) -> InventoryResult<()> {
    if item.is_equipment() {
        Ok(())
    } else {
        Err(InventoryError::precondition(format!(
            "{} is not equipment; cannot {}",
            item.item_id, what
        )))
    }
}

pub fn plan(
    item: &InventoryItem,
    transition: &Transition,
    now: DateTime<Utc>,
) -> InventoryResult<Plan> {
    // Transitions that read current state are guarded by the revision they were planned on.
    let guarded = Patch::new().if_revision(item.rev);

    let (patch, action, details) = match transition {
        Transition::Receive { quantity } => {
            if *quantity == 0 {
                return Err(InventoryError::precondition("received quantity must be at least 1"));
            }
            let levels = stock_levels(item, "receive")?;
            let stock = levels.stock.checked_add(*quantity).ok_or_else(|| {
                InventoryError::precondition(format!("stock of {} would overflow", item.item_id))
            })?;
            let status = derive_status(stock, levels.min_stock);
            (
                guarded
                    .set("stock", stock)
                    .set("status", status.as_str())
                    .set("lastReceived", timestamp(now)),
                ActivityAction::ReceiveStock,
                format!("Received {} (stock {} -> {})", quantity, levels.stock, stock),
            )
        }

        Transition::UpdateStock { stock } => {
            let levels = stock_levels(item, "update")?;
            let status = derive_status(*stock, levels.min_stock);
            (
                guarded.set("stock", *stock).set("status", status.as_str()),
                ActivityAction::UpdateStock,
                format!("Stock {} -> {} ({})", levels.stock, stock, status),
            )
        }

        Transition::RequestReorder => {
            let levels = stock_levels(item, "reorder")?;
            let quantity = reorder_quantity(levels);
            (
                guarded
                    .set("requestedQuantity", quantity)
                    .set("status", ItemStatus::Requested.as_str())
                    .set("requestedAt", timestamp(now)),
                ActivityAction::RequestReorder,
                format!(
                    "Requested {} (stock {}, minimum {})",
                    quantity, levels.stock, levels.min_stock
                ),
            )
        }

        Transition::RequestRepair { issue } => {
            require_equipment(item, "request a repair")?;
            let issue = issue.trim();
            if issue.is_empty() {
                return Err(InventoryError::precondition("describe the issue to request a repair"));
            }
            (
                guarded
                    .set("equipmentStatus", EquipmentStatus::Finicky.as_str())
                    .set("status", ItemStatus::Requested.as_str())
                    .set("repairIssue", issue)
                    .set("requestedAt", timestamp(now)),
                ActivityAction::RequestRepair,
                issue.to_string(),
            )
        }

        Transition::Approve => {
            if item.status != ItemStatus::Requested {
                return Err(InventoryError::precondition(format!(
                    "{} is {}, only requested items can be approved",
                    item.item_id, item.status
                )));
            }
            let mut patch = guarded
                .set("status", ItemStatus::Ordered.as_str())
                .set("orderedAt", timestamp(now));
            let details = if item.is_equipment() {
                patch = patch.set("equipmentStatus", EquipmentStatus::RepairRequested.as_str());
                "Repair approved".to_string()
            } else {
                format!("Order approved ({})", item.requested_quantity.unwrap_or(1))
            };
            (patch, ActivityAction::ApproveRequest, details)
        }

        Transition::SetEquipmentStatus(status) => {
            require_equipment(item, "set an equipment status")?;
            let mut patch = guarded.set("equipmentStatus", status.as_str());
            if *status == EquipmentStatus::Working {
                patch = patch
                    .set("status", ItemStatus::InStock.as_str())
                    .set("repairedAt", timestamp(now));
            }
            (patch, ActivityAction::UpdateEquipmentStatus, status.to_string())
        }

        Transition::UpdateLocation(location) => {
            let location = location.trim();
            if location.is_empty() {
                return Err(InventoryError::precondition("location must not be empty"));
            }
            (
                Patch::new().set("location", location),
                ActivityAction::UpdateLocation,
                format!("{} -> {}", item.location, location),
            )
        }

        Transition::UpdateOwner(owner) => {
            let patch = match owner {
                Some(member) => Patch::new().set("owner", json!(member)),
                None => Patch::new().unset("owner"),
            };
            let details = match owner {
                Some(member) => format!("Owner set to {}", member.member_id),
                None => "Moved to lab stock".to_string(),
            };
            (patch, ActivityAction::UpdateOwner, details)
        }
    };

    Ok(Plan {
        patch,
        activity: ActivityEntry::for_item(action, item).details(details),
    })
}
