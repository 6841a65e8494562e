use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, query_param};

use shared_config::AppConfig;
use shared_database::supabase::{DataApiError, SupabaseClient};

fn client_for(server: &MockServer) -> SupabaseClient {
    SupabaseClient::new(&AppConfig::with_data_api(&server.uri(), "test-secret"))
}

#[tokio::test]
async fn test_select_sends_api_key_and_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("clinic_id", "eq.c1"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rows: Vec<Value> = client.select("patients", "clinic_id=eq.c1", "user-token").await.unwrap();

    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_select_one_returns_none_for_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let row: Option<Value> = client.select_one("clinics", "code=eq.NOPE", "token").await.unwrap();

    assert!(row.is_none());
}

#[tokio::test]
async fn test_insert_asks_for_representation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/locations"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": "l1", "name": "Main"}])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rows: Vec<Value> = client.insert("locations", json!({"name": "Main"}), "token").await.unwrap();

    assert_eq!(rows[0]["name"], "Main");
}

#[tokio::test]
async fn test_conflict_status_is_typed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key value"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.insert::<Value>("clinics", json!({"code": "SMILE"}), "token").await.unwrap_err();

    assert!(DataApiError::is_conflict(&err));
}

#[tokio::test]
async fn test_unauthorized_status_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.select::<Value>("users", "", "token").await.unwrap_err();

    assert!(matches!(DataApiError::of(&err), Some(DataApiError::Auth(_))));
}

#[tokio::test]
async fn test_upsert_merges_on_conflict_columns() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patient_specialties"))
        .and(query_param("on_conflict", "patient_id,specialty_id"))
        .and(header("Prefer", "resolution=merge-duplicates,return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"patient_id": "p1", "specialty_id": "s1"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rows: Vec<Value> = client
        .upsert(
            "patient_specialties",
            "patient_id,specialty_id",
            json!([{"patient_id": "p1", "specialty_id": "s1"}]),
            "token",
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}
