use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{self, AppState};

pub fn create_router(state: AppState, upload_dir: &Path) -> Router {
    Router::new()
        // Inventory items
        .route("/api/items", get(handlers::inventory::items_list))
        .route("/api/items", post(handlers::inventory::create_item))
        .route("/api/items/:item_id", get(handlers::inventory::item_detail))
        .route("/api/items/:item_id/receive", post(handlers::inventory::receive_item))
        .route("/api/items/:item_id/stock", post(handlers::inventory::update_stock))
        .route("/api/items/:item_id/reorder", post(handlers::inventory::request_reorder))
        .route("/api/items/:item_id/repair", post(handlers::inventory::request_repair))
        .route("/api/items/:item_id/approve", post(handlers::inventory::approve))
        .route(
            "/api/items/:item_id/equipment-status",
            post(handlers::inventory::set_equipment_status),
        )
        .route("/api/items/:item_id/location", post(handlers::inventory::update_location))
        .route("/api/items/:item_id/owner", post(handlers::inventory::update_owner))
        .route("/api/items/:item_id/notes", post(handlers::inventory::add_note))

        // Barcode scanning
        .route("/api/barcodes/:barcode", get(handlers::inventory::item_by_barcode))
        .route("/api/barcodes/:barcode/receive", post(handlers::inventory::receive_barcode))

        // Lookups
        .route("/api/locations", get(handlers::api::locations))
        .route("/api/ids/next", get(handlers::api::next_id))
        .route("/api/members", get(handlers::api::members))
        .route("/api/activity", get(handlers::activities::activities_list))

        // Uploaded item photos
        .nest_service("/uploads", ServeDir::new(upload_dir))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
        )
        .with_state(state)
}
