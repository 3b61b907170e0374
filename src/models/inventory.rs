use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::team::MemberRef;
use crate::error::StoreError;
use crate::store::Document;

pub const INVENTORY_ITEM: &str = "inventoryItem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    General,
    Biological,
    Equipment,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::General, Category::Biological, Category::Equipment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Biological => "Biological",
            Category::Equipment => "Equipment",
        }
    }

    /// Reorder threshold applied when a new item does not give one.
    pub fn default_min_stock(&self) -> u32 {
        match self {
            Category::General => 5,
            Category::Biological => 1,
            Category::Equipment => 0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    Requested,
    Ordered,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::InStock => "In Stock",
            ItemStatus::LowStock => "Low Stock",
            ItemStatus::Requested => "Requested",
            ItemStatus::Ordered => "Ordered",
            ItemStatus::OutOfStock => "Out of Stock",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ItemStatus::InStock,
            ItemStatus::LowStock,
            ItemStatus::Requested,
            ItemStatus::Ordered,
            ItemStatus::OutOfStock,
        ]
        .into_iter()
        .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Working,
    Finicky,
    Broken,
    #[serde(rename = "Repair Requested")]
    RepairRequested,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Working => "Working",
            EquipmentStatus::Finicky => "Finicky",
            EquipmentStatus::Broken => "Broken",
            EquipmentStatus::RepairRequested => "Repair Requested",
        }
    }
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            EquipmentStatus::Working,
            EquipmentStatus::Finicky,
            EquipmentStatus::Broken,
            EquipmentStatus::RepairRequested,
        ]
        .into_iter()
        .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown equipment status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevels {
    pub stock: u32,
    pub min_stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentState {
    pub equipment_status: EquipmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_issue: Option<String>,
}

/// Category-specific part of an item. Only stockable categories carry stock
/// levels; only equipment carries an operational status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum ItemKind {
    General(StockLevels),
    Biological(StockLevels),
    Equipment(EquipmentState),
}

impl ItemKind {
    pub fn category(&self) -> Category {
        match self {
            ItemKind::General(_) => Category::General,
            ItemKind::Biological(_) => Category::Biological,
            ItemKind::Equipment(_) => Category::Equipment,
        }
    }

    pub fn stock_levels(&self) -> Option<StockLevels> {
        match self {
            ItemKind::General(levels) | ItemKind::Biological(levels) => Some(*levels),
            ItemKind::Equipment(_) => None,
        }
    }

    pub fn equipment(&self) -> Option<&EquipmentState> {
        match self {
            ItemKind::Equipment(state) => Some(state),
            _ => None,
        }
    }
}

/// Reference to an uploaded asset plus the URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub asset_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_key")]
    pub key: String,
    pub content: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    #[serde(rename = "_key")]
    pub key: String,
    pub asset: AssetRef,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Store document id.
    #[serde(skip)]
    pub id: String,
    /// Store revision the item was read at.
    #[serde(skip)]
    pub rev: i64,
    pub item_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<MemberRef>,
    pub status: ItemStatus,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_received: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repaired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<AssetRef>,
}

impl InventoryItem {
    pub fn from_document(doc: &Document) -> Result<Self, StoreError> {
        let mut item: InventoryItem = doc.decode()?;
        item.id = doc.id.clone();
        item.rev = doc.rev;
        Ok(item)
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_equipment(&self) -> bool {
        matches!(self.kind, ItemKind::Equipment(_))
    }

    pub fn stock_levels(&self) -> Option<StockLevels> {
        self.kind.stock_levels()
    }
}

/// JSON shape returned to the action layer for a single item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub item: InventoryItem,
}

impl From<InventoryItem> for ItemView {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id.clone(),
            item,
        }
    }
}
