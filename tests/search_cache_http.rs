// tests/search_cache_http.rs
// Search endpoint behaviour with the per-user result cache in front of the store.

#[macro_use]
mod common;

use actix_web::http::header::AUTHORIZATION;
use actix_web::http::StatusCode;
use actix_web::test;
use common::{TestEnv, ALICE, BOB};
use serde_json::Value;

fn cache_header<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get("X-Cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[actix_web::test]
async fn repeated_search_is_served_from_cache() {
    let env = TestEnv::new();
    let x = env.seed("alice", "Entry X", "nature walk in the rain").await;
    env.seed("alice", "Entry Y", "city noise").await;
    let z = env.seed("alice", "Entry Z", "nature sounds at night").await;
    let app = test_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(cache_header(&resp), "MISS");
    let first: Vec<Value> = test::read_body_json(resp).await;
    let ids: Vec<&str> = first.iter().map(|e| e["entryId"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&x.as_str()) && ids.contains(&z.as_str()));
    assert_eq!(env.store.prefix_query_count(), 1);

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(cache_header(&resp), "HIT");
    let second: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(first, second);
    assert_eq!(env.store.prefix_query_count(), 1);
}

#[actix_web::test]
async fn normalized_queries_share_a_cache_entry() {
    let env = TestEnv::new();
    env.seed("alice", "Walk", "nature walk").await;
    let app = test_app!(env);

    for uri in ["/api/audio/search?q=nature", "/api/audio/search?q=%20%20nature%20"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((AUTHORIZATION, ALICE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(env.store.prefix_query_count(), 1);
}

#[actix_web::test]
async fn delete_invalidates_cached_search() {
    let env = TestEnv::new();
    let x = env.seed("alice", "Entry X", "nature walk").await;
    let z = env.seed("alice", "Entry Z", "nature sounds").await;
    let app = test_app!(env);

    let search = || {
        test::TestRequest::get()
            .uri("/api/audio/search?q=nature")
            .insert_header((AUTHORIZATION, ALICE))
            .to_request()
    };

    let resp = test::call_service(&app, search()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(env.store.prefix_query_count(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/audio/{}", x))
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Entry deleted");
    assert_eq!(body["entryId"], x.as_str());

    let resp = test::call_service(&app, search()).await;
    assert_eq!(cache_header(&resp), "MISS");
    let results: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(env.store.prefix_query_count(), 2);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["entryId"], z.as_str());
}

#[actix_web::test]
async fn users_never_see_each_others_results() {
    let env = TestEnv::new();
    env.seed("bob", "Bob's walk", "nature trail").await;
    let alice_entry = env.seed("alice", "Alice's walk", "nature park").await;
    let app = test_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, BOB))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(cache_header(&resp), "MISS");

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(cache_header(&resp), "MISS");
    let results: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["entryId"], alice_entry.as_str());
    assert_eq!(results[0]["userId"], "alice");
    assert_eq!(env.store.prefix_query_count(), 2);
}

#[actix_web::test]
async fn update_invalidates_only_the_writer() {
    let env = TestEnv::new();
    let alice_entry = env.seed("alice", "Walk", "nature walk").await;
    env.seed("bob", "Walk", "nature walk").await;
    let app = test_app!(env);

    for token in [ALICE, BOB] {
        let req = test::TestRequest::get()
            .uri("/api/audio/search?q=nature")
            .insert_header((AUTHORIZATION, token))
            .to_request();
        test::call_service(&app, req).await;
    }
    assert_eq!(env.store.prefix_query_count(), 2);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/audio/{}", alice_entry))
        .insert_header((AUTHORIZATION, ALICE))
        .set_json(serde_json::json!({ "title": "Renamed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, BOB))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(cache_header(&resp), "HIT");

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(cache_header(&resp), "MISS");
    let results: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(results[0]["title"], "Renamed");
    assert_eq!(env.store.prefix_query_count(), 3);
}

#[actix_web::test]
async fn blank_query_is_rejected() {
    let env = TestEnv::new();
    let app = test_app!(env);

    for uri in ["/api/audio/search?q=%20%20%20", "/api/audio/search"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((AUTHORIZATION, ALICE))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["error"],
            "Query parameter \"q\" is required and must be a non-empty string."
        );
    }
    assert_eq!(env.store.prefix_query_count(), 0);
}

#[actix_web::test]
async fn overlong_query_is_capped() {
    let env = TestEnv::new();
    let app = test_app!(env);
    let long = "a".repeat(250);

    let req = test::TestRequest::get()
        .uri(&format!("/api/audio/search?q={}", long))
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Same first 100 chars, different tail: same cache key.
    let req = test::TestRequest::get()
        .uri(&format!("/api/audio/search?q={}bbb", "a".repeat(100)))
        .insert_header((AUTHORIZATION, ALICE))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(cache_header(&resp), "HIT");
    assert_eq!(env.store.prefix_query_count(), 1);
}

#[actix_web::test]
async fn unauthenticated_search_never_reaches_the_store() {
    let env = TestEnv::new();
    let app = test_app!(env);

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized: No token provided");

    let req = test::TestRequest::get()
        .uri("/api/audio/search?q=nature")
        .insert_header((AUTHORIZATION, "Bearer forged"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized: Invalid token");

    assert_eq!(env.store.call_count(), 0);
}
