//! Serves stored photos as streaming responses.

use crate::{errors::AppError, models::item::PhotoRef, services::AppStore};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/photos/{photo_ref}`
pub async fn get_photo(
    State(store): State<AppStore>,
    Path(photo_ref): Path<String>,
) -> Result<Response, AppError> {
    let photo = store.photos().open(&PhotoRef::new(photo_ref)).await?;
    let body = Body::from_stream(ReaderStream::new(photo.file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(photo.content_type),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(photo.size_bytes));
    // Refs are never reused, so the bytes behind one never change.
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=31536000, immutable"),
    );

    Ok(response)
}
