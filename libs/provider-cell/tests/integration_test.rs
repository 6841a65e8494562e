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

use provider_cell::router::provider_routes;
use shared_models::auth::StaffRole;
use shared_models::specialty::SpecialtyCode;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_url(&mock_server.uri());
    (provider_routes(Arc::new(config.to_app_config())), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mount_catalogue(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/specialties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::specialty_catalogue_response()
        ))
        .mount(mock_server)
        .await;
}

fn create_request(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_admin_creates_provider_with_temporary_password() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let hygienist = TestUser::new("hygienist@example.com", StaffRole::Hygienist).in_clinic(admin.clinic_id);
    let profile_id = Uuid::new_v4();

    mount_catalogue(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "role": "hygienist", "clinic_id": admin.clinic_id })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&hygienist, "$argon2id$stub", 0)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::provider_profile_response(&profile_id, &hygienist.id, &admin.clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/provider_specialties"))
        .and(query_param("provider_id", format!("eq.{}", profile_id)))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_specialties"))
        .and(query_param("on_conflict", "provider_id,specialty_id"))
        .and(body_partial_json(json!([{
            "provider_id": profile_id,
            "specialty_id": MockSupabaseResponses::specialty_id(SpecialtyCode::Periodontics)
        }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(create_request(&token, json!({
        "email": "hygienist@example.com",
        "full_name": "Test Staff",
        "role": "hygienist",
        "specialties": ["periodontics"]
    }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["provider"]["id"], profile_id.to_string());
    assert_eq!(json_response["provider"]["role"], "hygienist");
    assert_eq!(json_response["provider"]["specialties"][0]["code"], "periodontics");
    assert!(json_response["temporary_password"].as_str().unwrap().len() >= 12);
}

/// Mounts the catalogue, an empty email lookup and a successful account insert.
async fn mount_new_account(mock_server: &MockServer, account: &TestUser) {
    mount_catalogue(mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_account_response(account, "$argon2id$stub", 0)
        ])))
        .expect(1)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_failed_profile_insert_removes_new_account() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let dentist = TestUser::dentist("new.dentist@example.com").in_clinic(admin.clinic_id);

    mount_new_account(&mock_server, &dentist).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", dentist.id)))
        .and(query_param("clinic_id", format!("eq.{}", admin.clinic_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(create_request(&token, json!({
        "email": "new.dentist@example.com",
        "full_name": "New Dentist",
        "role": "dentist"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body.get("temporary_password").is_none());
}

#[tokio::test]
async fn test_failed_specialty_link_removes_profile_and_account() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let dentist = TestUser::dentist("new.dentist@example.com").in_clinic(admin.clinic_id);
    let profile_id = Uuid::new_v4();

    mount_new_account(&mock_server, &dentist).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::provider_profile_response(&profile_id, &dentist.id, &admin.clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_specialties"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/provider_profiles"))
        .and(query_param("id", format!("eq.{}", profile_id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", dentist.id)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(create_request(&token, json!({
        "email": "new.dentist@example.com",
        "full_name": "New Dentist",
        "role": "dentist",
        "specialties": ["endodontics"]
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

fn update_request(token: &str, provider_id: &Uuid, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/{}", provider_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_update_provider_replaces_specialty_set() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let dentist = TestUser::dentist("dentist@example.com").in_clinic(admin.clinic_id);
    let profile_id = Uuid::new_v4();
    let endo = MockSupabaseResponses::specialty_id(SpecialtyCode::Endodontics);

    mount_catalogue(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_profiles"))
        .and(query_param("clinic_id", format!("eq.{}", admin.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_profile_response(&profile_id, &dentist.id, &admin.clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/provider_profiles"))
        .and(query_param("id", format!("eq.{}", profile_id)))
        .and(body_partial_json(json!({ "title": "Dr.", "calendar_color": "#aa3355" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", dentist.id)))
        .and(body_partial_json(json!({ "full_name": "Dr. Root" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&dentist, "hash", 0)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/provider_specialties"))
        .and(query_param("on_conflict", "provider_id,specialty_id"))
        .and(body_partial_json(json!([{ "provider_id": profile_id, "specialty_id": endo }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/provider_specialties"))
        .and(query_param("provider_id", format!("eq.{}", profile_id)))
        .and(query_param("specialty_id", format!("not.in.({})", endo)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&dentist, "hash", 0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_specialties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "provider_id": profile_id, "specialty_id": endo }
        ])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(update_request(&token, &profile_id, json!({
        "full_name": "Dr. Root",
        "title": "Dr.",
        "calendar_color": "#aa3355",
        "specialties": ["endodontics"]
    }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["id"], profile_id.to_string());
    assert_eq!(json_response["specialties"].as_array().unwrap().len(), 1);
    assert_eq!(json_response["specialties"][0]["code"], "endodontics");
}

#[tokio::test]
async fn test_update_provider_requires_admin() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let dentist = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&dentist, &config.jwt_secret, Some(1));

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(update_request(&token, &Uuid::new_v4(), json!({ "title": "Prof." }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_foreign_provider_is_not_found() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_profiles"))
        .and(query_param("clinic_id", format!("eq.{}", admin.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(update_request(&token, &Uuid::new_v4(), json!({
        "specialties": ["endodontics"]
    }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_provider_rejects_non_provider_role() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));

    let response = app.oneshot(create_request(&token, json!({
        "email": "desk@example.com",
        "full_name": "Front Desk",
        "role": "receptionist"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_provider_with_duplicate_email_conflicts() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let existing = TestUser::dentist("dentist@example.com").in_clinic(admin.clinic_id);

    mount_catalogue(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&existing, "hash", 0)
        ])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(create_request(&token, json!({
        "email": "dentist@example.com",
        "full_name": "Another Dentist",
        "role": "dentist"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_provider_requires_admin() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let dentist = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&dentist, &config.jwt_secret, Some(1));

    let response = app.oneshot(create_request(&token, json!({
        "email": "new@example.com",
        "full_name": "New Dentist",
        "role": "dentist"
    }))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_providers_filters_by_specialty() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::receptionist("desk@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let endo = TestUser::dentist("endo@example.com").in_clinic(user.clinic_id);
    let perio = TestUser::new("perio@example.com", StaffRole::Hygienist).in_clinic(user.clinic_id);
    let endo_profile = Uuid::new_v4();
    let perio_profile = Uuid::new_v4();

    mount_catalogue(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_profiles"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_profile_response(&endo_profile, &endo.id, &user.clinic_id),
            MockSupabaseResponses::provider_profile_response(&perio_profile, &perio.id, &user.clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&endo, "hash", 0),
            MockSupabaseResponses::user_account_response(&perio, "hash", 0)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_specialties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "provider_id": endo_profile, "specialty_id": MockSupabaseResponses::specialty_id(SpecialtyCode::Endodontics) },
            { "provider_id": perio_profile, "specialty_id": MockSupabaseResponses::specialty_id(SpecialtyCode::Periodontics) }
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/?specialty=endodontics")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["total"], 1);
    assert_eq!(json_response["providers"][0]["id"], endo_profile.to_string());
    assert_eq!(json_response["providers"][0]["email"], "endo@example.com");
}

#[tokio::test]
async fn test_get_foreign_provider_is_not_found() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_profiles"))
        .and(query_param("clinic_id", format!("eq.{}", user.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", Uuid::new_v4()))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deactivate_provider_disables_account() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));
    let dentist = TestUser::dentist("dentist@example.com").in_clinic(admin.clinic_id);
    let profile_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/provider_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::provider_profile_response(&profile_id, &dentist.id, &admin.clinic_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/provider_profiles"))
        .and(body_partial_json(json!({ "is_active": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", dentist.id)))
        .and(body_partial_json(json!({ "is_active": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&dentist, "hash", 0)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/{}", profile_id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_team_listing_hides_password_hashes() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let admin = TestUser::admin("owner@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_account_response(&admin, "$argon2id$secret", 0)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/team")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["total"], 1);
    assert!(json_response["members"][0].get("password_hash").is_none());
    assert_eq!(json_response["members"][0]["role"], "admin");
}
