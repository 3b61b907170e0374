pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{ConfigError, InventoryError, InventoryResult, StoreError};
pub use handlers::AppState;
pub use router::create_router;
pub use services::InventoryService;
