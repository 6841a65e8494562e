use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Failure classes reported by the data API. Carried inside `anyhow::Error`
/// so callers can `downcast_ref` when they need to map a status.
#[derive(Debug, Error)]
pub enum DataApiError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl DataApiError {
    pub fn of(err: &anyhow::Error) -> Option<&DataApiError> {
        err.downcast_ref::<DataApiError>()
    }

    pub fn is_conflict(err: &anyhow::Error) -> bool {
        matches!(Self::of(err), Some(DataApiError::Conflict(_)))
    }
}

/// Percent-encodes a value for use inside a PostgREST filter.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    /// Key used for calls made before a user token exists (signup, login).
    pub fn service_token(&self) -> &str {
        &self.service_role_key
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            let err = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DataApiError::Auth(error_text),
                StatusCode::NOT_FOUND => DataApiError::NotFound(error_text),
                StatusCode::CONFLICT => DataApiError::Conflict(error_text),
                _ => DataApiError::Api { status: status.as_u16(), message: error_text },
            };
            return Err(anyhow::Error::new(err));
        }

        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(Value::Array(vec![]))
                .map_err(|e| anyhow!("Empty response could not be decoded: {}", e));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// GET `/rest/v1/{table}?{query}` decoded into rows.
    pub async fn select<T>(&self, table: &str, query: &str, auth_token: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = if query.is_empty() {
            format!("/rest/v1/{}", table)
        } else {
            format!("/rest/v1/{}?{}", table, query)
        };
        self.request(Method::GET, &path, Some(auth_token), None).await
    }

    pub async fn select_one<T>(&self, table: &str, query: &str, auth_token: &str) -> Result<Option<T>>
    where T: DeserializeOwned {
        let query = if query.is_empty() {
            "limit=1".to_string()
        } else {
            format!("{}&limit=1", query)
        };
        let mut rows: Vec<T> = self.select(table, &query, auth_token).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    /// POST a row (or array of rows) and return the stored representation.
    pub async fn insert<T>(&self, table: &str, body: Value, auth_token: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(auth_token),
            Some(body),
            Some(Self::representation_headers()),
        ).await
    }

    /// POST rows that replace existing ones on the `on_conflict` columns.
    pub async fn upsert<T>(&self, table: &str, on_conflict: &str, body: Value, auth_token: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}?on_conflict={}", table, on_conflict),
            Some(auth_token),
            Some(body),
            Some(headers),
        ).await
    }

    pub async fn update<T>(&self, table: &str, filter: &str, body: Value, auth_token: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        self.request_with_headers(
            Method::PATCH,
            &format!("/rest/v1/{}?{}", table, filter),
            Some(auth_token),
            Some(body),
            Some(Self::representation_headers()),
        ).await
    }

    pub async fn delete(&self, table: &str, filter: &str, auth_token: &str) -> Result<()> {
        let _: Vec<Value> = self.request_with_headers(
            Method::DELETE,
            &format!("/rest/v1/{}?{}", table, filter),
            Some(auth_token),
            None,
            Some(Self::representation_headers()),
        ).await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
