//! Defines routes for the item tracker API.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Collection endpoints**
//!   - `GET    /items`         — list items (optional `?sort=newest|oldest|name`)
//!   - `POST   /items`         — add item (multipart)
//!   - `DELETE /items`         — clear all items
//!   - `GET    /items/search`  — case-insensitive name search (`?q=`)
//!
//! - **Item endpoints**
//!   - `GET    /items/{id}`    — fetch one item
//!   - `PUT    /items/{id}`    — edit item (multipart, `photoAction`)
//!   - `DELETE /items/{id}`    — delete item
//!
//! - **Photos**
//!   - `GET    /photos/{photo_ref}` — stream photo bytes

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        item_handlers::{
            clear_items, create_item, delete_item, get_item, list_items, search_items,
            update_item,
        },
        photo_handlers::get_photo,
    },
    services::AppStore,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};

/// Build the router for every endpoint. Carries `AppStore` as shared state.
pub fn routes() -> Router<AppStore> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/items",
            get(list_items).post(create_item).delete(clear_items),
        )
        .route("/items/search", get(search_items))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/photos/{photo_ref}", get(get_photo))
}

/// The complete application: routes, state and the upload size cap.
pub fn app(store: AppStore, max_upload_bytes: usize) -> Router {
    routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        item_store::ItemStore, photo_resolver::FilePhotoResolver,
        record_store::tests::memory_sqlite,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "thing-finder-test-boundary";

    async fn test_app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ItemStore::new(memory_sqlite().await, FilePhotoResolver::new(dir.path()));
        (app(store, 1024 * 1024), dir)
    }

    fn form_body(fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((content_type, bytes)) = photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn form_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, name: &str, location: &str) -> String {
        let body = form_body(&[("itemName", name), ("location", location)], None);
        let resp = send(app, form_request("POST", "/items", body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json(resp).await["id"].as_str().unwrap().to_string()
    }

    fn names(list: &Value) -> Vec<&str> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|item| item["itemName"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_checks_report_ok() {
        let (app, _dir) = test_app().await;

        let resp = send(&app, request("GET", "/healthz")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, request("GET", "/readyz")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json(resp).await;
        assert_eq!(body["checks"]["sqlite"]["ok"], true);
        assert_eq!(body["checks"]["photos"]["ok"], true);
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let (app, _dir) = test_app().await;
        let id = create(&app, "Keys", "Hallway hook").await;

        let resp = send(&app, request("GET", &format!("/items/{id}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let item = json(resp).await;
        assert_eq!(item["itemName"], "Keys");
        assert_eq!(item["location"], "Hallway hook");
        assert!(item["photoRef"].is_null());
        assert_eq!(item["createdAt"], item["updatedAt"]);

        let list = json(send(&app, request("GET", "/items")).await).await;
        assert_eq!(names(&list), ["Keys"]);
    }

    #[tokio::test]
    async fn blank_fields_are_bad_requests() {
        let (app, _dir) = test_app().await;
        let body = form_body(&[("itemName", "  "), ("location", "Desk")], None);

        let resp = send(&app, form_request("POST", "/items", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err = json(resp).await;
        assert_eq!(err["status"], 400);

        let list = json(send(&app, request("GET", "/items")).await).await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_sorting_and_search() {
        let (app, _dir) = test_app().await;
        for name in ["red umbrella", "Sunglasses", "Blue Umbrella"] {
            create(&app, name, "somewhere").await;
        }

        let list = json(send(&app, request("GET", "/items?sort=name")).await).await;
        assert_eq!(names(&list), ["Blue Umbrella", "red umbrella", "Sunglasses"]);

        let list = json(send(&app, request("GET", "/items")).await).await;
        assert_eq!(names(&list), ["red umbrella", "Sunglasses", "Blue Umbrella"]);

        let resp = send(&app, request("GET", "/items?sort=bogus")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let hits = json(send(&app, request("GET", "/items/search?q=UMBRELLA")).await).await;
        assert_eq!(names(&hits), ["red umbrella", "Blue Umbrella"]);

        let hits = json(send(&app, request("GET", "/items/search?q=%20%20")).await).await;
        assert!(hits.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_keeps_whitespace_inside_the_term() {
        let (app, _dir) = test_app().await;
        for name in ["Blue scarf", "Bluetooth speaker"] {
            create(&app, name, "somewhere").await;
        }

        let hits = json(send(&app, request("GET", "/items/search?q=blue%20")).await).await;
        assert_eq!(names(&hits), ["Blue scarf"]);
    }

    #[tokio::test]
    async fn photo_lifecycle_over_http() {
        let (app, _dir) = test_app().await;
        let id = create(&app, "Bike helmet", "Garage").await;

        let body = form_body(
            &[("itemName", "Bike helmet"), ("location", "Shed")],
            Some(("image/png", &b"fake png bytes"[..])),
        );
        let resp = send(&app, form_request("PUT", &format!("/items/{id}"), body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["id"], id.as_str());

        let item = json(send(&app, request("GET", &format!("/items/{id}"))).await).await;
        assert_eq!(item["location"], "Shed");
        let photo_ref = item["photoRef"].as_str().unwrap().to_string();

        let resp = send(&app, request("GET", &format!("/photos/{photo_ref}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"fake png bytes");

        let body = form_body(
            &[
                ("itemName", "Bike helmet"),
                ("location", "Shed"),
                ("photoAction", "remove"),
            ],
            None,
        );
        let resp = send(&app, form_request("PUT", &format!("/items/{id}"), body)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, request("GET", &format!("/photos/{photo_ref}"))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replace_without_photo_is_rejected() {
        let (app, _dir) = test_app().await;
        let id = create(&app, "Watch", "Nightstand").await;

        let body = form_body(
            &[
                ("itemName", "Watch"),
                ("location", "Nightstand"),
                ("photoAction", "replace"),
            ],
            None,
        );
        let resp = send(&app, form_request("PUT", &format!("/items/{id}"), body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_unknown_item_is_not_found() {
        let (app, _dir) = test_app().await;
        let body = form_body(&[("itemName", "x"), ("location", "y")], None);

        let resp = send(&app, form_request("PUT", "/items/nonexistent", body)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&app, request("GET", "/items/nonexistent")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deletes_are_idempotent_and_clear_empties() {
        let (app, _dir) = test_app().await;
        let id = create(&app, "Charger", "Office").await;
        create(&app, "Mug", "Kitchen").await;

        for _ in 0..2 {
            let resp = send(&app, request("DELETE", &format!("/items/{id}"))).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }
        let list = json(send(&app, request("GET", "/items")).await).await;
        assert_eq!(names(&list), ["Mug"]);

        let resp = send(&app, request("DELETE", "/items")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let list = json(send(&app, request("GET", "/items")).await).await;
        assert!(list.as_array().unwrap().is_empty());
    }
}
