//! REST client store
//!
//! Talks to a realtime database over its REST protocol:
//! `GET|PUT|PATCH|DELETE {base}/{path}.json`, JSON bodies, and error
//! bodies shaped like `{"error": "..."}`.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, Method, Response};
use serde::Deserialize;
use url::Url;

use crate::core::errors::StoreError;
use crate::core::path::PathError;
use crate::core::store::RemoteStore;
use crate::core::value::Value;

/// Configuration of the REST client
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the database, e.g. `https://my-project-default-rtdb.firebaseio.com`
    pub base_url: String,
    /// Token sent as the `auth` query parameter
    pub auth: Option<String>,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            base_url: "http://127.0.0.1:3000".to_string(),
            auth: None,
        }
    }
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Remote store reached over HTTP
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: Url,
    auth: Option<String>,
    http_client: HttpClient,
}

impl RestStore {
    /// Create a new client with the configuration provided
    pub fn new(config: RestConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidData(format!(
                "`{}` cannot be used as a database URL",
                config.base_url
            )));
        }

        Ok(RestStore {
            base_url,
            auth: config.auth,
            http_client: HttpClient::new(),
        })
    }

    /// URL of the JSON resource for `path`.
    ///
    /// The path is not validated here; each segment is percent-encoded and
    /// the server decides whether it is acceptable. The one exception is a
    /// `.` or `..` segment: URLs resolve those (even as `%2E`), so the
    /// request would reach another location. They are refused instead.
    pub fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if let Some(dot) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(PathError::ForbiddenCharacter(dot.to_string()).into());
        }

        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| StoreError::Internal("database URL cannot hold a path".to_string()))?;
            parts.pop_if_empty();

            match segments.split_last() {
                Some((last, parents)) => {
                    parts.extend(parents);
                    parts.push(&format!("{}.json", last));
                }
                None => {
                    parts.push(".json");
                }
            }
        }

        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }

        Ok(url)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Response, StoreError> {
        let url = self.endpoint(path)?;
        debug!("RestStore: {} {}", method, path);

        let mut request = self.http_client.request(method, url);
        if let Some(body) = body {
            request = request.json(&serde_json::Value::from(body));
        }

        let response = request.send().await?;
        Self::check(response).await
    }

    /// Turn non-2xx responses into `StoreError::Remote`
    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
        };

        Err(StoreError::Remote {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    type Error = StoreError;

    async fn set_value(&self, path: &str, data: Value) -> Result<(), StoreError> {
        self.send(Method::PUT, path, Some(data)).await?;
        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let response = self.send(Method::GET, path, None).await?;
        let json: serde_json::Value = response.json().await?;

        let value = Value::from(json);
        if value.is_null() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    async fn merge_update(&self, path: &str, partial: Value) -> Result<(), StoreError> {
        self.send(Method::PATCH, path, Some(partial)).await?;
        Ok(())
    }

    async fn remove_value(&self, path: &str) -> Result<(), StoreError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }
}
