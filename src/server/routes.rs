// src/server/routes.rs
//! REST routes of the rtdb server
//!
//! Every location of the tree is a JSON resource at `/{path}.json`.

use std::sync::Arc;

use log::debug;
use serde::{Serialize, Deserialize};
use warp::filters::body::json;
use warp::http::StatusCode;
use warp::path::Tail;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::core::errors::StoreError;
use crate::core::path::PathError;
use crate::core::store::RemoteStore;
use crate::core::value::Value;

/// Query parameters accepted on every resource
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    /// Shared secret, required when the server is configured with one
    pub auth: Option<String>,
}

/// Body of every error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Failure of a request, with the status it is reported under
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        let status = if error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError::new(status, error.to_string())
    }
}

/// Store and access rules shared by the handlers
struct ServerState<S> {
    store: Arc<S>,
    secret: Option<String>,
}

impl<S> ServerState<S> {
    fn authorize(&self, query: &AuthQuery) -> Result<(), ApiError> {
        match &self.secret {
            Some(secret) if query.auth.as_deref() != Some(secret.as_str()) => {
                Err(ApiError::new(StatusCode::UNAUTHORIZED, "Permission denied"))
            }
            _ => Ok(()),
        }
    }
}

/// Create the REST routes over the given store
pub fn api_routes<S>(
    store: Arc<S>,
    secret: Option<String>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    S: RemoteStore<Error = StoreError> + 'static,
{
    let state = Arc::new(ServerState { store, secret });

    // GET /{path}.json
    let get_route = warp::get()
        .and(warp::path::tail())
        .and(warp::query::<AuthQuery>())
        .and(with_state(state.clone()))
        .and_then(handle_get::<S>);

    // PUT /{path}.json
    let put_route = warp::put()
        .and(warp::path::tail())
        .and(warp::query::<AuthQuery>())
        .and(json::<serde_json::Value>())
        .and(with_state(state.clone()))
        .and_then(handle_put::<S>);

    // PATCH /{path}.json
    let patch_route = warp::patch()
        .and(warp::path::tail())
        .and(warp::query::<AuthQuery>())
        .and(json::<serde_json::Value>())
        .and(with_state(state.clone()))
        .and_then(handle_patch::<S>);

    // DELETE /{path}.json
    let delete_route = warp::delete()
        .and(warp::path::tail())
        .and(warp::query::<AuthQuery>())
        .and(with_state(state))
        .and_then(handle_delete::<S>);

    get_route.or(put_route).or(patch_route).or(delete_route)
}

/// Share the server state with the handlers
fn with_state<S: Send + Sync>(
    state: Arc<ServerState<S>>,
) -> impl Filter<Extract = (Arc<ServerState<S>>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Turn the request tail ("users/alice.json") into the store path ("users/alice")
fn parse_tail(tail: &Tail) -> Result<String, ApiError> {
    let raw = tail.as_str().strip_suffix(".json").ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "Resources must be addressed as /{path}.json")
    })?;

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        let decoded = urlencoding::decode(segment)
            .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid path encoding"))?;
        // an encoded '/' belongs to a key, it must not become a separator
        if decoded.contains('/') {
            return Err(StoreError::from(PathError::ForbiddenCharacter(decoded.into_owned())).into());
        }
        segments.push(decoded.into_owned());
    }

    Ok(segments.join("/"))
}

fn respond(result: Result<serde_json::Value, ApiError>) -> WithStatus<Json> {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK),
        Err(e) => {
            debug!("request failed with {}: {}", e.status, e.message);
            warp::reply::with_status(warp::reply::json(&ErrorBody { error: e.message }), e.status)
        }
    }
}

async fn read<S>(tail: &Tail, query: &AuthQuery, state: &ServerState<S>) -> Result<serde_json::Value, ApiError>
where
    S: RemoteStore<Error = StoreError>,
{
    state.authorize(query)?;
    let path = parse_tail(tail)?;
    let value = state.store.read_once(&path).await?;
    Ok(serde_json::Value::from(value.unwrap_or(Value::Null)))
}

async fn write<S>(
    tail: &Tail,
    query: &AuthQuery,
    body: serde_json::Value,
    state: &ServerState<S>,
) -> Result<serde_json::Value, ApiError>
where
    S: RemoteStore<Error = StoreError>,
{
    state.authorize(query)?;
    let path = parse_tail(tail)?;
    state.store.set_value(&path, Value::from(body.clone())).await?;
    Ok(body)
}

async fn merge<S>(
    tail: &Tail,
    query: &AuthQuery,
    body: serde_json::Value,
    state: &ServerState<S>,
) -> Result<serde_json::Value, ApiError>
where
    S: RemoteStore<Error = StoreError>,
{
    state.authorize(query)?;
    let path = parse_tail(tail)?;
    state.store.merge_update(&path, Value::from(body.clone())).await?;
    Ok(body)
}

async fn remove<S>(tail: &Tail, query: &AuthQuery, state: &ServerState<S>) -> Result<serde_json::Value, ApiError>
where
    S: RemoteStore<Error = StoreError>,
{
    state.authorize(query)?;
    let path = parse_tail(tail)?;
    state.store.remove_value(&path).await?;
    Ok(serde_json::Value::Null)
}

/// Handler for GET /{path}.json
async fn handle_get<S>(tail: Tail, query: AuthQuery, state: Arc<ServerState<S>>) -> Result<impl Reply, Rejection>
where
    S: RemoteStore<Error = StoreError>,
{
    Ok(respond(read(&tail, &query, &state).await))
}

/// Handler for PUT /{path}.json
async fn handle_put<S>(
    tail: Tail,
    query: AuthQuery,
    body: serde_json::Value,
    state: Arc<ServerState<S>>,
) -> Result<impl Reply, Rejection>
where
    S: RemoteStore<Error = StoreError>,
{
    Ok(respond(write(&tail, &query, body, &state).await))
}

/// Handler for PATCH /{path}.json
async fn handle_patch<S>(
    tail: Tail,
    query: AuthQuery,
    body: serde_json::Value,
    state: Arc<ServerState<S>>,
) -> Result<impl Reply, Rejection>
where
    S: RemoteStore<Error = StoreError>,
{
    Ok(respond(merge(&tail, &query, body, &state).await))
}

/// Handler for DELETE /{path}.json
async fn handle_delete<S>(tail: Tail, query: AuthQuery, state: Arc<ServerState<S>>) -> Result<impl Reply, Rejection>
where
    S: RemoteStore<Error = StoreError>,
{
    Ok(respond(remove(&tail, &query, &state).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::storage::MemoryStore;

    fn routes(secret: Option<&str>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        api_routes(Arc::new(MemoryStore::new()), secret.map(String::from))
    }

    fn body(bytes: &[u8]) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_patch_delete() {
        let api = routes(None);

        let res = warp::test::request()
            .method("PUT")
            .path("/test/path.json")
            .json(&json!({"name": "John", "age": 30}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(res.body()), json!({"name": "John", "age": 30}));

        let res = warp::test::request()
            .method("PATCH")
            .path("/test/path.json")
            .json(&json!({"name": "Bob"}))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);

        let res = warp::test::request().method("GET").path("/test/path.json").reply(&api).await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(res.body()), json!({"name": "Bob", "age": 30}));

        let res = warp::test::request().method("GET").path("/.json").reply(&api).await;
        assert_eq!(body(res.body()), json!({"test": {"path": {"name": "Bob", "age": 30}}}));

        let res = warp::test::request().method("DELETE").path("/test/path.json").reply(&api).await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(res.body()), json!(null));

        let res = warp::test::request().method("GET").path("/test/path.json").reply(&api).await;
        assert_eq!(body(res.body()), json!(null));
    }

    #[tokio::test]
    async fn test_invalid_path_is_bad_request() {
        let api = routes(None);

        let res = warp::test::request()
            .method("GET")
            .path("/test/path.something.json")
            .reply(&api)
            .await;
        assert_eq!(res.status(), 400);
        assert!(body(res.body())["error"].as_str().unwrap().contains("path.something"));
    }

    #[tokio::test]
    async fn test_encoded_segments_are_decoded() {
        let api = routes(None);

        let res = warp::test::request()
            .method("PUT")
            .path("/users/john%20doe.json")
            .json(&json!(1))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);

        let res = warp::test::request().method("GET").path("/users.json").reply(&api).await;
        assert_eq!(body(res.body()), json!({"john doe": 1}));

        let res = warp::test::request().method("GET").path("/a%23b.json").reply(&api).await;
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn test_encoded_slash_is_not_a_separator() {
        let api = routes(None);

        let res = warp::test::request()
            .method("PUT")
            .path("/a%2Fb.json")
            .json(&json!(1))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 400);

        let res = warp::test::request().method("GET").path("/a/b.json").reply(&api).await;
        assert_eq!(body(res.body()), json!(null));

        // a literal percent sign is a legal key character
        let res = warp::test::request()
            .method("PUT")
            .path("/discounts/100%25.json")
            .json(&json!(true))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 200);

        let res = warp::test::request().method("GET").path("/discounts.json").reply(&api).await;
        assert_eq!(body(res.body()), json!({"100%": true}));
    }

    #[tokio::test]
    async fn test_missing_json_suffix() {
        let api = routes(None);

        let res = warp::test::request().method("GET").path("/test/path").reply(&api).await;
        assert_eq!(res.status(), 404);
        assert!(body(res.body())["error"].is_string());
    }

    #[tokio::test]
    async fn test_patch_requires_object() {
        let api = routes(None);

        let res = warp::test::request()
            .method("PATCH")
            .path("/test.json")
            .json(&json!([1, 2]))
            .reply(&api)
            .await;
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn test_secret_is_enforced() {
        let api = routes(Some("s3cret"));

        let res = warp::test::request().method("GET").path("/a.json").reply(&api).await;
        assert_eq!(res.status(), 401);
        assert_eq!(body(res.body()), json!({"error": "Permission denied"}));

        let res = warp::test::request().method("GET").path("/a.json?auth=wrong").reply(&api).await;
        assert_eq!(res.status(), 401);

        let res = warp::test::request().method("GET").path("/a.json?auth=s3cret").reply(&api).await;
        assert_eq!(res.status(), 200);
    }
}
