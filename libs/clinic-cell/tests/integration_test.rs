use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use clinic_cell::router::clinic_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_url(&mock_server.uri());
    (clinic_routes(Arc::new(config.to_app_config())), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_get_current_clinic() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", user.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_response(&user.clinic_id, "SMILE")
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["code"], "SMILE");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let (app, _) = create_test_app(&mock_server);

    let request = Request::builder()
        .method("GET")
        .uri("/locations")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_only_sees_active_locations() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/locations"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::location_response(&Uuid::new_v4(), &user.clinic_id, "City Centre")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/locations?include_inactive=true")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["total"], 1);
}

#[tokio::test]
async fn test_create_location_requires_admin() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let request = Request::builder()
        .method("POST")
        .uri("/locations")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"name": "Northside"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_location_as_admin() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let location_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/locations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::location_response(&location_id, &user.clinic_id, "Northside")
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/locations")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"name": "Northside"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["id"], location_id.to_string());
}

#[tokio::test]
async fn test_update_unknown_location_is_not_found() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/locations/{}", Uuid::new_v4()))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"is_active": false}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn update_clinic_request(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_admin_updates_clinic() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let mut updated = MockSupabaseResponses::clinic_response(&user.clinic_id, "SMILE");
    updated["name"] = json!("Smile Dental Group");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", user.clinic_id)))
        .and(body_partial_json(json!({
            "name": "Smile Dental Group",
            "email": "front@smile.example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(update_clinic_request(&token, json!({
        "name": "  Smile Dental Group ",
        "email": "Front@Smile.example.com"
    }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Smile Dental Group");
}

#[tokio::test]
async fn test_update_clinic_requires_admin() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(update_clinic_request(&token, json!({ "name": "Renamed" }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_clinic_rejects_bad_email() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = app.oneshot(update_clinic_request(&token, json!({ "email": "not-an-email" }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_missing_clinic_is_not_found() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(update_clinic_request(&token, json!({ "phone": "+353 1 555 0199" }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
