//! Book CRUD, cover uploads, and book-scoped store search over HTTP.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::json;

use bookaholic_core::Role;
use bookaholic_integration_tests::{
    BOSTON_ADDRESS, BOSTON_ZIP, LA_ADDRESS, MAX_UPLOAD_BYTES, TestApp, send,
};

fn cover(bytes: Vec<u8>, file_name: &str, mime: &str) -> Form {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_owned())
        .mime_str(mime)
        .expect("valid mime type");
    Form::new().part("file", part)
}

#[tokio::test]
async fn test_create_book_in_store() {
    let app = TestApp::spawn().await;
    let (owner, user) = app.register("Owner", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;

    let book = app.create_book(&owner, &store, "Dune").await;
    assert_eq!(book["name"], "Dune");
    assert_eq!(book["authorName"], "Frank Herbert");
    assert_eq!(book["store"], store["id"]);
    assert_eq!(book["owner"], user["id"]);
    assert_eq!(book["bookCover"], "no-photo.jpg");
    assert!(book["averageRating"].is_null());
}

#[tokio::test]
async fn test_create_book_checks_role_then_store() {
    let app = TestApp::spawn().await;
    let (reader, _) = app.register("Reader", Role::User).await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let body = json!({
        "name": "Dune",
        "description": "Spice",
        "price": 10,
        "authorName": "Frank Herbert",
    });

    let (status, _) = send(reader.post(app.api("/books/9999")).json(&body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(owner.post(app.api("/books/9999")).json(&body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Store not found with id of 9999");
}

#[tokio::test]
async fn test_create_book_validation() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;
    let path = app.api(&format!("/books/{}", store["id"]));

    let (status, _) = send(owner.post(&path).json(&json!({
        "name": "Dune",
        "description": "Spice",
        "price": -1,
        "authorName": "Frank Herbert",
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(owner.post(&path).json(&json!({
        "name": "x".repeat(51),
        "description": "Spice",
        "price": 1,
        "authorName": "Frank Herbert",
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.create_book(&owner, &store, "Dune").await;
    let (status, _) = send(owner.post(&path).json(&json!({
        "name": "Dune",
        "description": "Again",
        "price": 1,
        "authorName": "Frank Herbert",
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_book_ignores_derived_fields() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let (rival, _) = app.register("Rival", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;
    let book = app.create_book(&owner, &store, "Dune").await;
    let path = app.api(&format!("/books/{}", book["id"]));

    let (status, _) = send(rival.put(&path).json(&json!({"price": 1}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(owner.put(&path).json(&json!({
        "price": "7.25",
        "averageRating": 10,
        "bookCover": "evil.jpg",
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], "7.25");
    assert!(body["data"]["averageRating"].is_null());
    assert_eq!(body["data"]["bookCover"], "no-photo.jpg");
}

#[tokio::test]
async fn test_delete_book_removes_reviews() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let (reader, _) = app.register("Reader", Role::User).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;
    let book = app.create_book(&owner, &store, "Dune").await;
    let review = app.create_review(&reader, &book, 9).await;

    let (status, body) = send(owner.delete(app.api(&format!("/books/{}", book["id"])))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {}}));

    let (status, _) =
        send(TestApp::client().get(app.api(&format!("/reviews/{}", review["id"])))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_store_removes_its_books() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;
    let book = app.create_book(&owner, &store, "Dune").await;

    let (status, _) = send(owner.delete(app.api(&format!("/stores/{}", store["id"])))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        send(TestApp::client().get(app.api(&format!("/books/{}", book["id"])))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_cover() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;
    let book = app.create_book(&owner, &store, "Dune").await;
    let path = app.api(&format!("/books/{}/photo", book["id"]));

    let (status, body) = send(
        owner
            .put(&path)
            .multipart(cover(vec![0x89, b'P', b'N', b'G'], "dune.png", "image/png")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let expected = format!("photo_{}.png", book["id"]);
    assert_eq!(body["data"], expected.as_str());
    assert_eq!(app.files.names().await, vec![expected.clone()]);
    assert_eq!(app.book(&book).await["bookCover"], expected.as_str());
}

#[tokio::test]
async fn test_upload_cover_rejections() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let (rival, _) = app.register("Rival", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Corner Books", BOSTON_ADDRESS).await;
    let book = app.create_book(&owner, &store, "Dune").await;
    let path = app.api(&format!("/books/{}/photo", book["id"]));

    let (status, _) = send(
        rival
            .put(&path)
            .multipart(cover(vec![1, 2, 3], "dune.png", "image/png")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        owner
            .put(&path)
            .multipart(cover(b"plain".to_vec(), "notes.txt", "text/plain")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        owner
            .put(&path)
            .multipart(cover(vec![0; MAX_UPLOAD_BYTES + 1], "big.png", "image/png")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        owner
            .put(&path)
            .multipart(Form::new().text("caption", "no file here")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.files.names().await.is_empty());
    assert_eq!(app.book(&book).await["bookCover"], "no-photo.jpg");
}

#[tokio::test]
async fn test_stores_near_book() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register("Owner", Role::StoreOwner).await;
    let store = app.create_store(&owner, "Boston Books", BOSTON_ADDRESS).await;
    app.create_store(&owner, "LA Books", LA_ADDRESS).await;
    let book = app.create_book(&owner, &store, "Dune").await;

    let (status, body) = send(TestApp::client().get(app.api(&format!(
        "/books/{}/stores/{BOSTON_ZIP}/25",
        book["id"]
    ))))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Boston Books");

    let (status, _) = send(
        TestApp::client().get(app.api(&format!("/books/9999/stores/{BOSTON_ZIP}/25"))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
