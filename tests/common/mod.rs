#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use labops::error::{AssetError, MailError, StoreError};
use labops::models::{Actor, AssetRef, Category, ACTIVITY_LOG, TEAM_MEMBER};
use labops::services::{
    AssetStore, ImageUpload, InventoryService, Mailer, NewItem, OutboundMail, ServiceSettings,
};
use labops::store::{Document, DocumentStore, Filter, MemoryStore, NewDocument, Patch};
use labops::utils::FixedClock;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 15, 30, 0).unwrap()
}

pub fn dana() -> Actor {
    Actor::user("Dana Reyes")
}

/// Wraps `MemoryStore` and can simulate other writers and outages.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Guarded patches that find a concurrent stock bump of +100 first.
    pub concurrent_bumps: AtomicUsize,
    /// Creates that find their unique item id taken by a concurrent create.
    pub stolen_ids: AtomicUsize,
    pub activity_down: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.inner.query(filter).await
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(id).await
    }

    async fn create(&self, doc: NewDocument) -> Result<Document, StoreError> {
        if !doc.unique.is_empty() && take_one(&self.stolen_ids) {
            let mut rival = doc.clone();
            rival.id = None;
            rival.body["name"] = json!("created concurrently");
            self.inner.create(rival).await?;
        }
        self.inner.create(doc).await
    }

    async fn create_if_not_exists(
        &self,
        id: &str,
        doc_type: &str,
        body: Value,
    ) -> Result<bool, StoreError> {
        if doc_type == ACTIVITY_LOG && self.activity_down.load(Ordering::SeqCst) {
            return Err(StoreError::Malformed("activity log offline".to_string()));
        }
        self.inner.create_if_not_exists(id, doc_type, body).await
    }

    async fn patch(&self, id: &str, patch: Patch) -> Result<Document, StoreError> {
        if patch.if_revision.is_some() && take_one(&self.concurrent_bumps) {
            let current = self
                .inner
                .get(id)
                .await?
                .ok_or_else(|| StoreError::Missing(id.to_string()))?;
            if current.body.get("stock").is_some() {
                self.inner.patch(id, Patch::new().inc("stock", 100)).await?;
            } else {
                self.inner.patch(id, Patch::new().set("location", "moved concurrently")).await?;
            }
        }
        self.inner.patch(id, patch).await
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutboundMail>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("smtp relay refused".to_string()));
        }
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAssets {
    pub fail: bool,
    pub uploads: AtomicUsize,
}

#[async_trait]
impl AssetStore for FakeAssets {
    async fn upload(&self, image: &ImageUpload) -> Result<AssetRef, AssetError> {
        if self.fail {
            return Err(AssetError::UnsupportedType(image.filename.clone()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AssetRef {
            asset_id: format!("image-{}", n),
            url: format!("/uploads/{}", image.filename),
        })
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub clock: Arc<FixedClock>,
    pub mailer: Arc<RecordingMailer>,
    pub assets: Arc<FakeAssets>,
    pub service: InventoryService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingMailer::default(), FakeAssets::default())
    }

    pub fn with(mailer: RecordingMailer, assets: FakeAssets) -> Self {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(FixedClock::at(start_time()));
        let mailer = Arc::new(mailer);
        let assets = Arc::new(assets);

        let service = InventoryService::new(store.clone())
            .with_settings(ServiceSettings {
                approval_email: Some("pi@lab.org".to_string()),
                public_base_url: "https://lab.example.org".to_string(),
                ..ServiceSettings::default()
            })
            .with_clock(clock.clone())
            .with_mailer(mailer.clone())
            .with_assets(assets.clone());

        Self {
            store,
            clock,
            mailer,
            assets,
            service,
        }
    }

    pub async fn add_member(&self, name: &str) -> String {
        self.store
            .inner
            .create(NewDocument::new(TEAM_MEMBER, json!({ "name": name, "email": "m@lab.org" })))
            .await
            .unwrap()
            .id
    }
}

pub fn stockable(name: &str, category: Category, stock: i64, min_stock: i64) -> NewItem {
    NewItem {
        name: name.to_string(),
        location: "Shelf A".to_string(),
        category: Some(category),
        stock: Some(stock),
        min_stock: Some(min_stock),
        ..NewItem::default()
    }
}

pub fn equipment(name: &str) -> NewItem {
    NewItem {
        name: name.to_string(),
        location: "Bay 2".to_string(),
        category: Some(Category::Equipment),
        ..NewItem::default()
    }
}
