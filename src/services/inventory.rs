//! Inventory mutation service.
//!
//! Every operation applies one transition to one item, persists it with a
//! single patch and then appends one activity event. Transitions that depend
//! on the item's current state are patched against the revision they were
//! planned on and re-planned when another writer got there first. Activity
//! logging, image upload and approval mail are secondary: their failures are
//! logged and never undo the primary write.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;

use super::activity::{ActivityEntry, ActivityLogger};
use super::assets::{AssetStore, ImageUpload, LocalAssetStore};
use super::id_allocator::{IdAllocator, IdNamespace, IdPrefixes, ItemCode};
use super::notifications::{approval_request, LogMailer, Mailer};
use super::status::derive_status;
use super::transitions::{plan, Transition};
use crate::error::{InventoryError, InventoryResult, StoreError};
use crate::models::{
    ActivityAction, ActivityEvent, Actor, AssetRef, Category, EquipmentState, EquipmentStatus,
    ImageEntry, InventoryItem, ItemKind, ItemStatus, MemberRef, Note, OwnerSelection, StockLevels,
    TeamMember, INVENTORY_ITEM, TEAM_MEMBER,
};
use crate::store::{DocumentStore, Filter, NewDocument, Patch, PatchOp};
use crate::utils::{lab_date, short_key, Clock, SystemClock};

/// Attempts per operation before giving up on a contended item or id.
const MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub lab_offset: FixedOffset,
    pub approval_email: Option<String>,
    pub public_base_url: String,
    pub prefixes: IdPrefixes,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            lab_offset: Utc.fix(),
            approval_email: None,
            public_base_url: "http://localhost:3000".to_string(),
            prefixes: IdPrefixes::default(),
        }
    }
}

/// How the caller identifies an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLookup {
    ItemId(String),
    Barcode(String),
}

impl ItemLookup {
    fn filter(&self) -> Filter {
        match self {
            ItemLookup::ItemId(code) => Filter::by_type(INVENTORY_ITEM).eq("itemId", code.trim()),
            ItemLookup::Barcode(code) => Filter::by_type(INVENTORY_ITEM).eq("barcode", code.trim()),
        }
    }

    fn describe(&self) -> String {
        match self {
            ItemLookup::ItemId(code) => format!("item {}", code.trim()),
            ItemLookup::Barcode(code) => format!("barcode {}", code.trim()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub location: String,
    pub category: Option<Category>,
    pub barcode: Option<String>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub owner: Option<MemberRef>,
    pub equipment_status: Option<EquipmentStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub category: Option<Category>,
    pub status: Option<ItemStatus>,
    pub owner: Option<OwnerSelection>,
}

/// Result of a stock-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub item_id: String,
    pub stock: u32,
    pub status: ItemStatus,
}

impl StockChange {
    fn from_item(item: &InventoryItem) -> Option<Self> {
        item.stock_levels().map(|levels| Self {
            item_id: item.item_id.clone(),
            stock: levels.stock,
            status: item.status,
        })
    }
}

fn non_negative(value: i64, field: &str) -> InventoryResult<u32> {
    u32::try_from(value)
        .map_err(|_| {
            InventoryError::precondition(format!("{} must be between 0 and {}", field, u32::MAX))
        })
}

fn positive(value: i64, field: &str) -> InventoryResult<u32> {
    if value <= 0 {
        return Err(InventoryError::precondition(format!("{} must be at least 1", field)));
    }
    non_negative(value, field)
}

fn image_ops(asset: &AssetRef, now: DateTime<Utc>) -> Vec<PatchOp> {
    let entry = ImageEntry {
        key: short_key(),
        asset: asset.clone(),
        timestamp: now,
    };
    vec![
        PatchOp::Prepend("images".to_string(), vec![json!(entry)]),
        PatchOp::Set("image".to_string(), json!(asset)),
    ]
}

pub struct InventoryService {
    store: Arc<dyn DocumentStore>,
    ids: IdAllocator,
    activity: ActivityLogger,
    assets: Arc<dyn AssetStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl InventoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let settings = ServiceSettings::default();
        Self {
            ids: IdAllocator::new(store.clone(), settings.prefixes.clone()),
            activity: ActivityLogger::new(store.clone()),
            assets: Arc::new(LocalAssetStore::new("static/uploads", "/uploads")),
            mailer: Arc::new(LogMailer),
            clock: Arc::new(SystemClock),
            store,
            settings,
        }
    }

    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.ids = IdAllocator::new(self.store.clone(), settings.prefixes.clone());
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Today's date at the lab.
    pub fn today(&self) -> NaiveDate {
        lab_date(self.clock.now(), self.settings.lab_offset)
    }

    // ---- reads ----

    async fn find(&self, lookup: &ItemLookup) -> InventoryResult<InventoryItem> {
        let docs = self.store.query(&lookup.filter()).await?;
        if docs.len() > 1 {
            warn!("{} matches {} items, using the first", lookup.describe(), docs.len());
        }
        let doc = docs
            .first()
            .ok_or_else(|| InventoryError::NotFound(lookup.describe()))?;
        Ok(InventoryItem::from_document(doc)?)
    }

    pub async fn get_item(&self, item_id: &str) -> InventoryResult<InventoryItem> {
        self.find(&ItemLookup::ItemId(item_id.to_string())).await
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> InventoryResult<InventoryItem> {
        self.find(&ItemLookup::Barcode(barcode.to_string())).await
    }

    pub async fn list_items(&self, query: &ItemQuery) -> InventoryResult<Vec<InventoryItem>> {
        let mut filter = Filter::by_type(INVENTORY_ITEM).order_by("itemId");
        if let Some(category) = query.category {
            filter = filter.eq("category", category.as_str());
        }
        if let Some(status) = query.status {
            filter = filter.eq("status", status.as_str());
        }
        if let Some(OwnerSelection::Member(id)) = &query.owner {
            filter = filter.eq("owner._ref", id.as_str());
        }

        let docs = self.store.query(&filter).await?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in &docs {
            match InventoryItem::from_document(doc) {
                Ok(item) => items.push(item),
                Err(e) => warn!("skipping unreadable inventory document: {}", e),
            }
        }
        if query.owner == Some(OwnerSelection::LabStock) {
            items.retain(|item| item.owner.is_none());
        }
        Ok(items)
    }

    /// Distinct locations currently in use, sorted.
    pub async fn observed_locations(&self) -> InventoryResult<Vec<String>> {
        let docs = self.store.query(&Filter::by_type(INVENTORY_ITEM)).await?;
        let locations: BTreeSet<String> = docs
            .iter()
            .filter_map(|d| d.field("location").and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(locations.into_iter().collect())
    }

    pub async fn list_members(&self) -> InventoryResult<Vec<TeamMember>> {
        let docs = self
            .store
            .query(&Filter::by_type(TEAM_MEMBER).order_by("name"))
            .await?;
        docs.iter()
            .map(|d| TeamMember::from_document(d).map_err(InventoryError::from))
            .collect()
    }

    /// What the next create in `namespace` would be assigned. Nothing is reserved.
    pub async fn preview_next_id(&self, namespace: IdNamespace) -> InventoryResult<ItemCode> {
        self.ids.next_free(namespace).await
    }

    pub async fn activity_for(&self, date: NaiveDate) -> InventoryResult<Vec<ActivityEvent>> {
        Ok(self.activity.events_for(date).await?)
    }

    // ---- secondary paths ----

    async fn log_activity(&self, actor: &Actor, at: DateTime<Utc>, entry: ActivityEntry) {
        let as_of = lab_date(at, self.settings.lab_offset);
        self.activity.record(as_of, at, actor, entry).await;
    }

    async fn upload_image(&self, image: Option<&ImageUpload>) -> Option<AssetRef> {
        let image = image?;
        match self.assets.upload(image).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!("image {} was not attached: {}", image.filename, e);
                None
            }
        }
    }

    /// Uploads the image for a freshly created item and links it in a follow-up patch.
    async fn attach_image(
        &self,
        item: InventoryItem,
        image: Option<&ImageUpload>,
        now: DateTime<Utc>,
    ) -> InventoryItem {
        let Some(asset) = self.upload_image(image).await else {
            return item;
        };
        let patch = Patch {
            if_revision: None,
            ops: image_ops(&asset, now),
        };
        match self.store.patch(&item.id, patch).await {
            Ok(doc) => match InventoryItem::from_document(&doc) {
                Ok(updated) => updated,
                Err(e) => {
                    warn!("{} reread after attaching image failed: {}", item.item_id, e);
                    item
                }
            },
            Err(e) => {
                warn!("image {} was uploaded but not linked to {}: {}", asset.url, item.item_id, e);
                item
            }
        }
    }

    async fn notify_approval(&self, item: &InventoryItem, actor: &Actor) {
        let Some(recipient) = self.settings.approval_email.as_deref() else {
            debug!("no approval recipient configured, skipping mail for {}", item.item_id);
            return;
        };
        let mail = approval_request(item, actor, recipient, &self.settings.public_base_url);
        if let Err(e) = self.mailer.send(&mail).await {
            warn!("approval request for {} was not sent: {}", item.item_id, e);
        }
    }

    // ---- mutations ----

    /// Plans and writes one transition, re-reading and re-planning on revision conflicts.
    async fn apply(
        &self,
        lookup: &ItemLookup,
        transition: Transition,
        extra_ops: Vec<PatchOp>,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        for attempt in 1..=MAX_ATTEMPTS {
            let item = self.find(lookup).await?;
            let now = self.clock.now();
            let mut planned = plan(&item, &transition, now)?;
            planned.patch.ops.extend(extra_ops.iter().cloned());

            match self.store.patch(&item.id, planned.patch).await {
                Ok(doc) => {
                    let updated = InventoryItem::from_document(&doc)?;
                    self.log_activity(actor, now, planned.activity).await;
                    return Ok(updated);
                }
                Err(StoreError::RevisionMismatch { expected, actual, .. }) => {
                    debug!(
                        "{} changed underneath us (rev {} -> {}), attempt {}/{}",
                        item.item_id, expected, actual, attempt, MAX_ATTEMPTS
                    );
                }
                Err(StoreError::Missing(_)) => {
                    return Err(InventoryError::NotFound(lookup.describe()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(InventoryError::Conflict(lookup.describe()))
    }

    pub async fn create_item(
        &self,
        new: NewItem,
        image: Option<&ImageUpload>,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        let name = new.name.trim().to_string();
        let location = new.location.trim().to_string();
        let category = new
            .category
            .ok_or_else(|| InventoryError::precondition("category is required"))?;
        if name.is_empty() {
            return Err(InventoryError::precondition("name is required"));
        }
        if location.is_empty() {
            return Err(InventoryError::precondition("location is required"));
        }

        let (kind, status) = match category {
            Category::Equipment => (
                ItemKind::Equipment(EquipmentState {
                    equipment_status: new.equipment_status.unwrap_or(EquipmentStatus::Working),
                    repair_issue: None,
                }),
                ItemStatus::InStock,
            ),
            stockable => {
                let levels = StockLevels {
                    stock: non_negative(new.stock.unwrap_or(0), "stock")?,
                    min_stock: match new.min_stock {
                        Some(v) => non_negative(v, "minStock")?,
                        None => stockable.default_min_stock(),
                    },
                };
                let kind = if stockable == Category::Biological {
                    ItemKind::Biological(levels)
                } else {
                    ItemKind::General(levels)
                };
                (kind, derive_status(levels.stock, levels.min_stock))
            }
        };

        if let Some(owner) = &new.owner {
            self.ensure_member(&owner.member_id).await?;
        }

        let now = self.clock.now();
        let mut item = InventoryItem {
            id: String::new(),
            rev: 0,
            item_id: String::new(),
            name,
            barcode: new
                .barcode
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty()),
            location,
            owner: new.owner,
            status,
            kind,
            requested_quantity: None,
            last_received: None,
            requested_at: None,
            ordered_at: None,
            repaired_at: None,
            notes: Vec::new(),
            images: Vec::new(),
            image: None,
        };

        for attempt in 1..=MAX_ATTEMPTS {
            let code = self.ids.next_free(category.into()).await?;
            item.item_id = code.to_string();

            let body = serde_json::to_value(&item).map_err(StoreError::from)?;
            match self
                .store
                .create(NewDocument::new(INVENTORY_ITEM, body).unique_on("itemId"))
                .await
            {
                Ok(doc) => {
                    let created = InventoryItem::from_document(&doc)?;
                    info!("created {} ({}) in {}", created.item_id, created.name, category);
                    self.log_activity(
                        actor,
                        now,
                        ActivityEntry::for_item(ActivityAction::CreateItem, &created)
                            .details(format!("{} at {}", category, created.location)),
                    )
                    .await;
                    return Ok(self.attach_image(created, image, now).await);
                }
                Err(StoreError::Conflict { .. }) => {
                    debug!("{} was taken concurrently, attempt {}/{}", code, attempt, MAX_ATTEMPTS);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(InventoryError::Conflict(format!("next {} id", category)))
    }

    pub async fn receive(
        &self,
        lookup: &ItemLookup,
        quantity: i64,
        image: Option<&ImageUpload>,
        actor: &Actor,
    ) -> InventoryResult<StockChange> {
        let quantity = positive(quantity, "quantity")?;
        let transition = Transition::Receive { quantity };

        // A receive that will be rejected must not leave an orphaned upload behind.
        let extra = match image {
            Some(image) => {
                let item = self.find(lookup).await?;
                plan(&item, &transition, self.clock.now())?;
                match self.upload_image(Some(image)).await {
                    Some(asset) => image_ops(&asset, self.clock.now()),
                    None => Vec::new(),
                }
            }
            None => Vec::new(),
        };
        let item = self.apply(lookup, transition, extra, actor).await?;
        StockChange::from_item(&item)
            .ok_or_else(|| InventoryError::precondition(format!("{} has no stock", item.item_id)))
    }

    pub async fn update_stock(
        &self,
        lookup: &ItemLookup,
        new_stock: i64,
        actor: &Actor,
    ) -> InventoryResult<StockChange> {
        let stock = non_negative(new_stock, "stock")?;
        let item = self
            .apply(lookup, Transition::UpdateStock { stock }, Vec::new(), actor)
            .await?;
        StockChange::from_item(&item)
            .ok_or_else(|| InventoryError::precondition(format!("{} has no stock", item.item_id)))
    }

    pub async fn request_reorder(
        &self,
        lookup: &ItemLookup,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        let item = self
            .apply(lookup, Transition::RequestReorder, Vec::new(), actor)
            .await?;
        self.notify_approval(&item, actor).await;
        Ok(item)
    }

    pub async fn request_repair(
        &self,
        lookup: &ItemLookup,
        issue: &str,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        let transition = Transition::RequestRepair {
            issue: issue.to_string(),
        };
        let item = self.apply(lookup, transition, Vec::new(), actor).await?;
        self.notify_approval(&item, actor).await;
        Ok(item)
    }

    pub async fn approve(
        &self,
        lookup: &ItemLookup,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        self.apply(lookup, Transition::Approve, Vec::new(), actor).await
    }

    pub async fn set_equipment_status(
        &self,
        lookup: &ItemLookup,
        status: EquipmentStatus,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        self.apply(lookup, Transition::SetEquipmentStatus(status), Vec::new(), actor)
            .await
    }

    pub async fn update_location(
        &self,
        lookup: &ItemLookup,
        location: &str,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        self.apply(
            lookup,
            Transition::UpdateLocation(location.to_string()),
            Vec::new(),
            actor,
        )
        .await
    }

    pub async fn update_owner(
        &self,
        lookup: &ItemLookup,
        owner: OwnerSelection,
        actor: &Actor,
    ) -> InventoryResult<InventoryItem> {
        if let OwnerSelection::Member(id) = &owner {
            self.ensure_member(id).await?;
        }
        self.apply(lookup, Transition::UpdateOwner(owner.into_ref()), Vec::new(), actor)
            .await
    }

    pub async fn add_note(
        &self,
        lookup: &ItemLookup,
        content: &str,
        author: &Actor,
    ) -> InventoryResult<Note> {
        let content = content.trim();
        if content.is_empty() {
            return Err(InventoryError::precondition("note must not be empty"));
        }

        let item = self.find(lookup).await?;
        let now = self.clock.now();
        let note = Note {
            key: short_key(),
            content: content.to_string(),
            author: author.author_name().to_string(),
            timestamp: now,
        };

        let patch = Patch::new()
            .set_if_missing("notes", json!([]))
            .append("notes", vec![json!(note)]);
        match self.store.patch(&item.id, patch).await {
            Ok(_) => {}
            Err(StoreError::Missing(_)) => return Err(InventoryError::NotFound(lookup.describe())),
            Err(e) => return Err(e.into()),
        }

        self.log_activity(
            author,
            now,
            ActivityEntry::for_item(ActivityAction::AddNote, &item).details(content),
        )
        .await;
        Ok(note)
    }

    async fn ensure_member(&self, member_id: &str) -> InventoryResult<()> {
        match self.store.get(member_id).await? {
            Some(doc) if doc.doc_type == TEAM_MEMBER => Ok(()),
            _ => Err(InventoryError::NotFound(format!("team member {}", member_id))),
        }
    }
}
