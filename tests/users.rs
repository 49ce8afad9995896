//! Profile reads, updates and profile images against a real PostgreSQL database.
//!
//! These tests are ignored by default. Run them with a database at `DATABASE_URL`
//! (a `.env` file is honored); migrations are applied on connect:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/recipeshare_test cargo test -- --include-ignored
//! ```

#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::json;

use common::{
    bearer, cleanup_user, db_pool, memory_store, multipart_image, register_user, unique_username,
};
use recipeshare::images::key_from_url;
use recipeshare::models::User;

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_profile_read_and_update() {
    common::init();
    let pool = db_pool().await;
    let (_, store) = memory_store();
    let app = test_app!(pool.clone(), store);

    let alice_name = unique_username("alice");
    let bob_name = unique_username("bob");
    let alice = register_user(&app, &alice_name, "Password123!").await;
    let bob = register_user(&app, &bob_name, "Password123!").await;

    // Anyone signed in can read a profile.
    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}", alice_name))
        .insert_header(bearer(&bob.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], alice_name.as_str());
    assert!(body.get("passwordHash").is_none());

    // Only the owner can update it.
    let update = json!({ "firstName": "Alice", "lastName": "Liddell", "bio": "  Loves tea  " });
    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice_name))
        .insert_header(bearer(&bob.token))
        .set_json(&update)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{}", alice_name))
        .insert_header(bearer(&alice.token))
        .set_json(&update)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: User = test::read_body_json(resp).await;
    assert_eq!(updated.first_name, "Alice");
    assert_eq!(updated.bio.as_deref(), Some("Loves tea"));

    let req = test::TestRequest::get()
        .uri("/api/users/nobody_by_this_name")
        .insert_header(bearer(&alice.token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    cleanup_user(&pool, &alice_name).await;
    cleanup_user(&pool, &bob_name).await;
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_profile_image_replaces_previous() {
    common::init();
    let pool = db_pool().await;
    let (memory, store) = memory_store();
    let app = test_app!(pool.clone(), store);

    let username = unique_username("painter");
    let user = register_user(&app, &username, "Password123!").await;

    let mut urls = Vec::new();
    for (mime, filename) in [("image/png", "first.png"), ("image/gif", "second.gif")] {
        let (content_type, body) = multipart_image(mime, filename, b"not really pixels");
        let req = test::TestRequest::post()
            .uri(&format!("/api/users/{}/image", username))
            .insert_header(bearer(&user.token))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: User = test::read_body_json(resp).await;
        urls.push(updated.image_url.expect("image url set"));
    }

    // Only the latest image survives in the store.
    assert_eq!(memory.len(), 1);
    assert!(!memory.contains(key_from_url(&urls[0]).unwrap()));
    assert!(memory.contains(key_from_url(&urls[1]).unwrap()));
    assert!(urls[1].ends_with(".gif"));

    // And it is served publicly.
    let req = test::TestRequest::get().uri(&urls[1]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), b"not really pixels");

    cleanup_user(&pool, &username).await;
}
