//! HTTP API tests: gallery browsing, upload intake and admin edits.

use actix_web::http::header;
use actix_web::test;
use serde_json::Value;
use wildlife_gallery_lib::models::Category;
use wildlife_gallery_lib::services::UploadLimits;

use super::test_helpers::*;

fn upload_request(token: Option<&str>, body: MultipartBody) -> actix_http::Request {
    let (content_type, bytes) = body.finish();
    let mut req = test::TestRequest::post()
        .uri("/api/v1/animals/upload")
        .insert_header((header::CONTENT_TYPE, content_type));
    if let Some(token) = token {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {}", token)));
    }
    req.set_payload(bytes).to_request()
}

fn red_fox_form() -> MultipartBody {
    MultipartBody::new()
        .text("name", "Red Fox")
        .text("species", "Vulpes vulpes")
        .text("location", "Boreal Forest")
        .file("images", "imgA.jpg", b"first image")
        .file("images", "imgB.jpg", b"second image")
}

#[actix_rt::test]
async fn test_upload_creates_animal() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;

    let resp = test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["created"], true);
    assert_eq!(body["images_added"], 2);

    let fox = harness.store.named("Red Fox").unwrap();
    assert_eq!(body["animal_id"], fox.id.to_string());
    assert_eq!(fox.species, "Vulpes vulpes");
    assert_eq!(fox.location, "Boreal Forest");
}

#[actix_rt::test]
async fn test_upload_requires_admin_session() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;

    let resp = test::call_service(&app, upload_request(None, red_fox_form())).await;
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UNAUTHORIZED");

    let resp = test::call_service(&app, upload_request(Some("forged.token.value"), red_fox_form()))
        .await;
    assert_eq!(resp.status().as_u16(), 401);

    assert_eq!(harness.storage.calls(), 0);
    assert!(harness.store.snapshot().is_empty());
}

#[actix_rt::test]
async fn test_upload_accepts_session_cookie() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;

    let (content_type, bytes) = red_fox_form().finish();
    let req = test::TestRequest::post()
        .uri("/api/v1/animals/upload")
        .insert_header((header::CONTENT_TYPE, content_type))
        .cookie(actix_web::cookie::Cookie::new(
            wildlife_gallery_lib::auth::SESSION_COOKIE,
            admin_token(),
        ))
        .set_payload(bytes)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[actix_rt::test]
async fn test_upload_without_name_is_rejected() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;

    let form = MultipartBody::new()
        .text("location", "Boreal Forest")
        .file("images", "imgA.jpg", b"first image");
    let resp = test::call_service(&app, upload_request(Some(&admin_token()), form)).await;

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_INPUT");
    assert_eq!(harness.storage.calls(), 0);
    assert_eq!(harness.classifier.calls(), 0);
}

#[actix_rt::test]
async fn test_upload_repeated_fields_keep_first_value() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;

    let form = MultipartBody::new()
        .text("name", "Red Fox")
        .text("name", "Grey Wolf")
        .text("species", "")
        .text("location", "Boreal Forest")
        .text("location", "Taiga")
        .file("images", "imgA.jpg", b"first image");
    let resp = test::call_service(&app, upload_request(Some(&admin_token()), form)).await;
    assert_eq!(resp.status().as_u16(), 200);

    let fox = harness.store.named("Red Fox").unwrap();
    assert_eq!(fox.location, "Boreal Forest");
    // Blank species counts as absent; the classifier's answer is used.
    assert_eq!(fox.species, "Vulpes vulpes");
    assert!(harness.store.named("Grey Wolf").is_none());
}

#[actix_rt::test]
async fn test_upload_enrichment_failure_maps_to_bad_gateway() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;

    let form = MultipartBody::new()
        .text("name", "Red Fox")
        .file("images", "imgA.jpg", b"first image")
        .file("images", "fail-classify.jpg", b"second image");
    let resp = test::call_service(&app, upload_request(Some(&admin_token()), form)).await;

    assert_eq!(resp.status().as_u16(), 502);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "ENRICHMENT_ERROR");
    assert!(harness.store.snapshot().is_empty());
}

#[actix_rt::test]
async fn test_upload_limits() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let limits = UploadLimits {
        max_upload_size: 64,
        max_files_per_request: 2,
    };
    let app = create_test_app(&harness, limits, 2).await;

    let too_big = MultipartBody::new()
        .text("name", "Red Fox")
        .file("images", "big.jpg", &[7u8; 128]);
    let resp = test::call_service(&app, upload_request(Some(&admin_token()), too_big)).await;
    assert_eq!(resp.status().as_u16(), 413);

    let too_many = MultipartBody::new()
        .text("name", "Red Fox")
        .file("images", "a.jpg", b"a")
        .file("images", "b.jpg", b"b")
        .file("images", "c.jpg", b"c");
    let resp = test::call_service(&app, upload_request(Some(&admin_token()), too_many)).await;
    assert_eq!(resp.status().as_u16(), 400);

    assert_eq!(harness.storage.calls(), 0);
}

#[actix_rt::test]
async fn test_upload_rejected_when_no_permits() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 0).await;

    let resp = test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    assert_eq!(resp.status().as_u16(), 503);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");
}

#[actix_rt::test]
async fn test_categories_include_zero_counts() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;

    let req = test::TestRequest::get().uri("/api/v1/categories").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), Category::ALL.len());
    assert_eq!(categories[0]["category"], "Arthropods");
    assert_eq!(categories[0]["count"], 0);
    let mammals = categories
        .iter()
        .find(|c| c["category"] == "Mammals")
        .unwrap();
    assert_eq!(mammals["count"], 1);
}

#[actix_rt::test]
async fn test_list_animals_by_category_and_name() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?category=mammals")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let animals = body["animals"].as_array().unwrap();
    assert_eq!(animals.len(), 1);
    assert_eq!(animals[0]["name"], "Red Fox");
    assert_eq!(animals[0]["imageDetails"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?category=Birds")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["animals"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?name=Red%20Fox")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["animals"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?category=Dinosaurs")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_rt::test]
async fn test_get_animal_by_id() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    let fox = harness.store.named("Red Fox").unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/animals/{}", fox.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["name"], "Red Fox");
    assert_eq!(body["category"], "Mammals");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/animals/{}", uuid::Uuid::now_v7()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);

    let req = test::TestRequest::get()
        .uri("/api/v1/animals/not-a-uuid")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
}

#[actix_rt::test]
async fn test_slideshow_lists_every_image() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/gallery/slideshow")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert!(images.iter().all(|i| i["name"] == "Red Fox"));
    assert!(images.iter().all(|i| i["category"] == "Mammals"));
}

#[actix_rt::test]
async fn test_update_and_delete_require_session() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    let fox = harness.store.named("Red Fox").unwrap();
    let uri = format!("/api/v1/animals/{}", fox.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .set_json(serde_json::json!({ "location": "Tundra" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);

    let req = test::TestRequest::delete().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);

    assert_eq!(harness.store.named("Red Fox").unwrap().location, "Boreal Forest");
}

#[actix_rt::test]
async fn test_update_edits_scalar_fields_only() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    let fox = harness.store.named("Red Fox").unwrap();
    let token = admin_token();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/animals/{}", fox.id))
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .set_json(serde_json::json!({
            "location": "Tundra",
            "description": "Hand written.",
            "category": "Birds"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["location"], "Tundra");
    assert_eq!(body["description"], "Hand written.");
    assert_eq!(body["category"], "Mammals");
    assert_eq!(body["images"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/animals/{}", fox.id))
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .set_json(serde_json::json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
}

#[actix_rt::test]
async fn test_delete_animal() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    let fox = harness.store.named("Red Fox").unwrap();
    let uri = format!("/api/v1/animals/{}", fox.id);
    let auth = (header::AUTHORIZATION, format!("Bearer {}", admin_token()));

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Animal deleted successfully");
    assert!(harness.store.snapshot().is_empty());

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(auth)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);
}

#[actix_rt::test]
async fn test_list_animals_by_species() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    let wolf = MultipartBody::new()
        .text("name", "Grey Wolf")
        .text("species", "Canis lupus")
        .file("images", "wolf.jpg", b"wolf image");
    test::call_service(&app, upload_request(Some(&admin_token()), wolf)).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?species=vulpes%20vulpes")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let animals = body["animals"].as_array().unwrap();
    assert_eq!(animals.len(), 1);
    assert_eq!(animals[0]["name"], "Red Fox");

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?species=Canis%20lupus&category=Mammals")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let animals = body["animals"].as_array().unwrap();
    assert_eq!(animals.len(), 1);
    assert_eq!(animals[0]["name"], "Grey Wolf");

    let req = test::TestRequest::get()
        .uri("/api/v1/animals?species=Canis%20lupus&category=Birds")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["animals"].as_array().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_update_rejects_overlong_location() {
    let harness = Harness::new(FakeClassifier::red_fox());
    let app = create_test_app(&harness, default_limits(), 2).await;
    test::call_service(&app, upload_request(Some(&admin_token()), red_fox_form())).await;
    let fox = harness.store.named("Red Fox").unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/animals/{}", fox.id))
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", admin_token())))
        .set_json(serde_json::json!({ "location": "x".repeat(256) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(harness.store.named("Red Fox").unwrap().location, "Boreal Forest");
}
