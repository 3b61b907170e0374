use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tower_cookies::Cookies;

use super::{ApiError, ApiResult, AppState};
use crate::{
    middleware::current_actor,
    models::{Category, EquipmentStatus, ItemStatus, ItemView, Note, OwnerSelection},
    services::{ImageUpload, ItemLookup, ItemQuery, NewItem, StockChange},
};

#[derive(Deserialize)]
pub struct ItemFilters {
    category: Option<String>,
    status: Option<String>,
    owner: Option<String>,
}

#[derive(Deserialize)]
pub struct StockForm {
    stock: i64,
}

#[derive(Deserialize)]
pub struct RepairForm {
    issue: String,
}

#[derive(Deserialize)]
pub struct EquipmentStatusForm {
    status: String,
}

#[derive(Deserialize)]
pub struct LocationForm {
    location: String,
}

#[derive(Deserialize)]
pub struct OwnerForm {
    // "lab-stock" or absent means no individual owner
    owner: Option<String>,
}

#[derive(Deserialize)]
pub struct NoteForm {
    content: String,
}

/// Text fields and the optional `image` file of a multipart submission.
struct ItemMultipart {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl ItemMultipart {
    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn integer(&self, name: &str) -> ApiResult<Option<i64>> {
        self.text(name)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| ApiError::bad_request(format!("{} must be a whole number", name)))
            })
            .transpose()
    }
}

async fn parse_item_multipart(mut multipart: Multipart) -> ApiResult<ItemMultipart> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "image" {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            if let Some(filename) = filename {
                if !data.is_empty() {
                    image = Some(ImageUpload {
                        filename,
                        data: data.to_vec(),
                    });
                }
            }
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            fields.insert(name, text);
        }
    }
    Ok(ItemMultipart { fields, image })
}

fn parse_label<T: std::str::FromStr<Err = String>>(raw: &str) -> ApiResult<T> {
    raw.parse::<T>().map_err(ApiError::BadRequest)
}

fn by_item_id(item_id: String) -> ItemLookup {
    ItemLookup::ItemId(item_id)
}

pub async fn items_list(
    State(state): State<AppState>,
    Query(filters): Query<ItemFilters>,
) -> ApiResult<Json<Vec<ItemView>>> {
    let query = ItemQuery {
        category: filters
            .category
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_label::<Category>)
            .transpose()?,
        status: filters
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_label::<ItemStatus>)
            .transpose()?,
        owner: filters
            .owner
            .as_deref()
            .map(|o| OwnerSelection::parse(Some(o))),
    };

    let items = state.service.list_items(&query).await?;
    Ok(Json(items.into_iter().map(ItemView::from).collect()))
}

pub async fn item_detail(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    let item = state.service.get_item(&item_id).await?;
    Ok(Json(item.into()))
}

pub async fn item_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<Json<ItemView>> {
    let item = state.service.find_by_barcode(&barcode).await?;
    Ok(Json(item.into()))
}

pub async fn create_item(
    State(state): State<AppState>,
    cookies: Cookies,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ItemView>)> {
    let actor = current_actor(&cookies, &state).await;
    let form = parse_item_multipart(multipart).await?;

    let category = match form.text("category") {
        Some(raw) => Some(parse_label::<Category>(&raw)?),
        None => None,
    };
    let equipment_status = match form.text("equipment_status") {
        Some(raw) => Some(parse_label::<EquipmentStatus>(&raw)?),
        None => None,
    };

    let new = NewItem {
        name: form.text("name").unwrap_or_default(),
        location: form.text("location").unwrap_or_default(),
        category,
        barcode: form.text("barcode"),
        stock: form.integer("stock")?,
        min_stock: form.integer("min_stock")?,
        owner: OwnerSelection::parse(form.text("owner").as_deref()).into_ref(),
        equipment_status,
    };

    let item = state
        .service
        .create_item(new, form.image.as_ref(), &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn receive_into(
    state: &AppState,
    cookies: &Cookies,
    lookup: ItemLookup,
    multipart: Multipart,
) -> ApiResult<Json<StockChange>> {
    let actor = current_actor(cookies, state).await;
    let form = parse_item_multipart(multipart).await?;
    let quantity = form
        .integer("quantity")?
        .ok_or_else(|| ApiError::bad_request("quantity is required"))?;

    let change = state
        .service
        .receive(&lookup, quantity, form.image.as_ref(), &actor)
        .await?;
    Ok(Json(change))
}

pub async fn receive_item(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<StockChange>> {
    receive_into(&state, &cookies, by_item_id(item_id), multipart).await
}

pub async fn receive_barcode(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(barcode): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<StockChange>> {
    receive_into(&state, &cookies, ItemLookup::Barcode(barcode), multipart).await
}

pub async fn update_stock(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Json(form): Json<StockForm>,
) -> ApiResult<Json<StockChange>> {
    let actor = current_actor(&cookies, &state).await;
    let change = state
        .service
        .update_stock(&by_item_id(item_id), form.stock, &actor)
        .await?;
    Ok(Json(change))
}

pub async fn request_reorder(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    let actor = current_actor(&cookies, &state).await;
    let item = state
        .service
        .request_reorder(&by_item_id(item_id), &actor)
        .await?;
    Ok(Json(item.into()))
}

pub async fn request_repair(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Json(form): Json<RepairForm>,
) -> ApiResult<Json<ItemView>> {
    let actor = current_actor(&cookies, &state).await;
    let item = state
        .service
        .request_repair(&by_item_id(item_id), &form.issue, &actor)
        .await?;
    Ok(Json(item.into()))
}

pub async fn approve(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    let actor = current_actor(&cookies, &state).await;
    let item = state.service.approve(&by_item_id(item_id), &actor).await?;
    Ok(Json(item.into()))
}

pub async fn set_equipment_status(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Json(form): Json<EquipmentStatusForm>,
) -> ApiResult<Json<ItemView>> {
    let actor = current_actor(&cookies, &state).await;
    let status = parse_label::<EquipmentStatus>(&form.status)?;
    let item = state
        .service
        .set_equipment_status(&by_item_id(item_id), status, &actor)
        .await?;
    Ok(Json(item.into()))
}

pub async fn update_location(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Json(form): Json<LocationForm>,
) -> ApiResult<Json<ItemView>> {
    let actor = current_actor(&cookies, &state).await;
    let item = state
        .service
        .update_location(&by_item_id(item_id), &form.location, &actor)
        .await?;
    Ok(Json(item.into()))
}

pub async fn update_owner(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Json(form): Json<OwnerForm>,
) -> ApiResult<Json<ItemView>> {
    let actor = current_actor(&cookies, &state).await;
    let owner = OwnerSelection::parse(form.owner.as_deref());
    let item = state
        .service
        .update_owner(&by_item_id(item_id), owner, &actor)
        .await?;
    Ok(Json(item.into()))
}

pub async fn add_note(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(item_id): Path<String>,
    Json(form): Json<NoteForm>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let actor = current_actor(&cookies, &state).await;
    let note = state
        .service
        .add_note(&by_item_id(item_id), &form.content, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}
