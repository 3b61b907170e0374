pub mod activity;
pub mod assets;
pub mod id_allocator;
pub mod inventory;
pub mod notifications;
pub mod status;
pub mod transitions;

pub use activity::{ActivityEntry, ActivityLogger};
pub use assets::{AssetStore, ImageUpload, LocalAssetStore};
pub use id_allocator::{IdAllocator, IdNamespace, IdPrefixes, ItemCode};
pub use inventory::{InventoryService, ItemLookup, ItemQuery, NewItem, ServiceSettings, StockChange};
pub use notifications::{LogMailer, Mailer, OutboundMail};
pub use status::derive_status;
