//! HTTP handlers for item operations.
//! Add and edit submissions arrive as multipart forms so a photo can ride
//! along with the text fields; everything else is JSON.

use crate::{
    errors::AppError,
    models::{
        item::{Item, ItemDraft, ItemId, PhotoAction, PhotoUpload},
        sort::{SortOrder, sorted},
    },
    services::AppStore,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Query params accepted by `GET /items`.
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    /// `newest`, `oldest` or `name`. Storage order when absent.
    pub sort: Option<String>,
}

/// Query params accepted by `GET /items/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: ItemId,
}

/// Fields collected from an add/edit multipart form.
#[derive(Debug, Default)]
struct ItemForm {
    draft: ItemDraft,
    photo: Option<PhotoUpload>,
    photo_action: Option<String>,
}

/// GET `/items` — every item, optionally sorted for display.
pub async fn list_items(
    State(store): State<AppStore>,
    Query(q): Query<ListItemsQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    let order = q
        .sort
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<SortOrder>)
        .transpose()
        .map_err(AppError::bad_request)?;

    let items = store.list_all().await?;
    let items = match order {
        Some(order) => sorted(&items, order),
        None => items,
    };
    Ok(Json(items))
}

/// GET `/items/search?q=` — blank queries return no results.
pub async fn search_items(
    State(store): State<AppStore>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    let term = q.q.as_deref().unwrap_or_default();
    if term.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(store.search(term).await?))
}

/// GET `/items/{id}`
pub async fn get_item(
    State(store): State<AppStore>,
    Path(id): Path<String>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(store.get_item(&ItemId::from(id)).await?))
}

/// POST `/items` — multipart add form.
pub async fn create_item(
    State(store): State<AppStore>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_item_form(multipart).await?;
    if form
        .photo_action
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty())
    {
        return Err(AppError::bad_request(
            "photoAction is only accepted when updating an item",
        ));
    }

    let id = store.create_item(form.draft, form.photo).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

/// PUT `/items/{id}` — multipart edit form.
pub async fn update_item(
    State(store): State<AppStore>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<IdResponse>, AppError> {
    let form = read_item_form(multipart).await?;
    let action = photo_action(form.photo_action.as_deref(), form.photo)?;

    let id = store
        .update_item(&ItemId::from(id), form.draft, action)
        .await?;
    Ok(Json(IdResponse { id }))
}

/// DELETE `/items/{id}` — succeeds whether or not the item still exists.
pub async fn delete_item(
    State(store): State<AppStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    store.delete_item(&ItemId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/items` — remove everything.
pub async fn clear_items(State(store): State<AppStore>) -> Result<StatusCode, AppError> {
    store.clear_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_item_form(mut multipart: Multipart) -> Result<ItemForm, AppError> {
    let mut form = ItemForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "itemName" => form.draft.item_name = field.text().await?,
            "location" => form.draft.location = field.text().await?,
            "additionalInfo" => form.draft.additional_info = field.text().await?,
            "photoAction" => form.photo_action = Some(field.text().await?),
            "photo" => {
                let content_type = field.content_type().map(str::to_string);
                let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field.bytes().await?;
                // Browsers submit an empty, unnamed part when no file was picked.
                if bytes.is_empty() && !has_file_name {
                    continue;
                }
                form.photo = Some(PhotoUpload::new(content_type, bytes));
            }
            other => debug!("ignoring unknown form field `{}`", other),
        }
    }

    Ok(form)
}

/// Resolve the explicit `photoAction` field against whether a photo was sent.
fn photo_action(
    requested: Option<&str>,
    photo: Option<PhotoUpload>,
) -> Result<PhotoAction, AppError> {
    // An unselected <select> submits an empty value; treat it as absent.
    let requested = requested
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty());
    match (requested.as_deref(), photo) {
        (None | Some("keep"), None) => Ok(PhotoAction::Keep),
        (None | Some("replace"), Some(upload)) => Ok(PhotoAction::Replace(upload)),
        (Some("remove"), None) => Ok(PhotoAction::Remove),
        (Some("replace"), None) => Err(AppError::bad_request(
            "photoAction `replace` requires a photo",
        )),
        (Some(action @ ("keep" | "remove")), Some(_)) => Err(AppError::bad_request(format!(
            "photoAction `{}` cannot be combined with a photo",
            action
        ))),
        (Some(other), _) => Err(AppError::bad_request(format!(
            "unknown photoAction `{}`",
            other
        ))),
    }
}
