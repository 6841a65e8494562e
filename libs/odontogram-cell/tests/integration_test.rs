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

use odontogram_cell::layout::{default_layout, MAX_SCALE};
use odontogram_cell::router::odontogram_routes;
use odontogram_cell::tooth::{Dentition, ToothId};
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(mock_server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_url(&mock_server.uri());
    (odontogram_routes(Arc::new(config.to_app_config())), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn finding_row(patient_id: &Uuid, clinic_id: &Uuid, tooth: u8, condition: &str, recorded_at: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "clinic_id": clinic_id,
        "patient_id": patient_id,
        "tooth": tooth,
        "surfaces": [],
        "condition": condition,
        "notes": null,
        "recorded_by": null,
        "recorded_at": recorded_at
    })
}

async fn mount_patient(mock_server: &MockServer, patient_id: &Uuid, clinic_id: &Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(patient_id, clinic_id)
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_chart_shows_latest_finding_per_tooth() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let patient_id = Uuid::new_v4();

    mount_patient(&mock_server, &patient_id, &user.clinic_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tooth_findings"))
        .and(query_param("order", "recorded_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            finding_row(&patient_id, &user.clinic_id, 36, "filling", "2024-03-01T10:00:00Z"),
            finding_row(&patient_id, &user.clinic_id, 11, "healthy", "2024-02-01T10:00:00Z"),
            finding_row(&patient_id, &user.clinic_id, 36, "caries", "2024-01-01T10:00:00Z")
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(request("GET", &format!("/patients/{}/chart", patient_id), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    let teeth = json_response["teeth"].as_array().unwrap();
    assert_eq!(teeth.len(), 2);
    assert_eq!(teeth[0]["tooth"], 11);
    assert_eq!(teeth[1]["tooth"], 36);
    assert_eq!(teeth[1]["condition"], "filling");
}

#[tokio::test]
async fn test_record_finding() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let patient_id = Uuid::new_v4();

    mount_patient(&mock_server, &patient_id, &user.clinic_id).await;

    let mut saved = finding_row(&patient_id, &user.clinic_id, 46, "caries", "2024-03-01T10:00:00Z");
    saved["surfaces"] = json!(["M", "O"]);

    Mock::given(method("POST"))
        .and(path("/rest/v1/tooth_findings"))
        .and(body_partial_json(json!({
            "tooth": 46,
            "surfaces": ["M", "O"],
            "condition": "caries",
            "recorded_by": user.id
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([saved])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(request(
            "POST",
            &format!("/patients/{}/findings", patient_id),
            &token,
            Some(json!({ "tooth": 46, "surfaces": ["O", "M", "O"], "condition": "caries" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["surfaces"], json!(["M", "O"]));
}

#[tokio::test]
async fn test_record_finding_rejects_surface_on_wrong_tooth() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("POST"))
        .and(path("/rest/v1/tooth_findings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(request(
            "POST",
            &format!("/patients/{}/findings", Uuid::new_v4()),
            &token,
            Some(json!({ "tooth": 21, "surfaces": ["O"], "condition": "caries" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_default_layout_without_overrides() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/odontogram_layouts"))
        .and(query_param("dentition", "eq.primary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(request("GET", "/layout?dentition=primary", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["dentition"], "primary");
    let teeth = json_response["teeth"].as_array().unwrap();
    assert_eq!(teeth.len(), 20);
    assert_eq!(teeth[0]["tooth"], 55);
}

#[tokio::test]
async fn test_stored_overrides_are_merged() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/odontogram_layouts"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "user_id": user.id,
            "dentition": "permanent",
            "poses": { "18": { "x": 20.0, "y": 30.0, "rotation": 15.0, "scale": 1.1 } },
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(request("GET", "/layout", &token, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    let teeth = json_response["teeth"].as_array().unwrap();
    assert_eq!(teeth.len(), 32);
    assert_eq!(teeth[0]["tooth"], 18);
    assert_eq!(teeth[0]["pose"]["x"], 20.0);

    let default_28 = default_layout(Dentition::Permanent).pose(ToothId::new(28).unwrap()).unwrap();
    let tooth_28 = teeth.iter().find(|t| t["tooth"] == 28).unwrap();
    assert_eq!(tooth_28["pose"]["x"], default_28.x);
}

#[tokio::test]
async fn test_drag_stores_clamped_pose() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/odontogram_layouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/odontogram_layouts"))
        .and(body_partial_json(json!({
            "user_id": user.id,
            "dentition": "permanent",
            "poses": { "18": { "x": 0.0 } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "user_id": user.id,
            "dentition": "permanent",
            "poses": { "18": { "x": 0.0, "y": 40.0, "rotation": -53.0, "scale": 1.25 } },
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(request("PATCH", "/layout/18/drag", &token, Some(json!({ "dx": -50.0, "dy": 0.0 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["tooth"], 18);
    assert_eq!(json_response["pose"]["x"], 0.0);
}

#[tokio::test]
async fn test_drag_rejects_invalid_tooth() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = app
        .oneshot(request("PATCH", "/layout/59/drag", &token, Some(json!({ "dx": 1.0, "dy": 1.0 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_layout_clamps_and_validates() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let layout_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/odontogram_layouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": layout_id,
            "user_id": user.id,
            "dentition": "permanent",
            "poses": {},
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/odontogram_layouts"))
        .and(query_param("id", format!("eq.{}", layout_id)))
        .and(body_partial_json(json!({ "poses": { "11": { "scale": MAX_SCALE } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": layout_id,
            "user_id": user.id,
            "dentition": "permanent",
            "poses": { "11": { "x": 50.0, "y": 10.0, "rotation": 0.0, "scale": MAX_SCALE } },
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app.clone()
        .oneshot(request(
            "PUT",
            "/layout",
            &token,
            Some(json!({ "poses": { "11": { "x": 50.0, "y": 10.0, "rotation": 0.0, "scale": 4.0 } } })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request(
            "PUT",
            "/layout",
            &token,
            Some(json!({ "poses": { "51": { "x": 50.0, "y": 10.0, "rotation": 0.0, "scale": 1.0 } } })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_layout() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server);
    let user = TestUser::dentist("dentist@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/odontogram_layouts"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .and(query_param("dentition", "eq.permanent"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app.oneshot(request("DELETE", "/layout", &token, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["teeth"].as_array().unwrap().len(), 32);
}

#[tokio::test]
async fn test_layout_requires_token() {
    let mock_server = MockServer::start().await;
    let (app, _) = create_test_app(&mock_server);

    let request = Request::builder()
        .method("GET")
        .uri("/layout")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
