pub mod activity;
pub mod inventory;
pub mod team;

pub use activity::{ActivityAction, ActivityEvent, DailyActivityLog, ACTIVITY_LOG};
pub use inventory::{
    AssetRef, Category, EquipmentState, EquipmentStatus, ImageEntry, InventoryItem, ItemKind,
    ItemStatus, ItemView, Note, StockLevels, INVENTORY_ITEM,
};
pub use team::{Actor, MemberRef, OwnerSelection, TeamMember, LAB_STOCK, TEAM_MEMBER};
