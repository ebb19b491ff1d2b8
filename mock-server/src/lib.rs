use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

pub const DEFAULT_API_KEY: &str = "mock-api-key";
pub const DEFAULT_JWT_SECRET: &str = "mock-jwt-secret";

/// Lifetime of an issued bearer token.
pub const TOKEN_TTL_SECS: u64 = 5 * 60;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
}

#[derive(Deserialize)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub api_key: String,
    pub jwt_secret: String,
}

impl Settings {
    pub fn new(api_key: &str, jwt_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            jwt_secret: jwt_secret.to_string(),
        }
    }

    /// Reads `API_SECRET_KEY` and `JWT_SECRET_KEY`, falling back to the
    /// built-in development values.
    pub fn from_env() -> Self {
        let api_key = std::env::var("API_SECRET_KEY").unwrap_or_else(|_| {
            tracing::warn!("API_SECRET_KEY not set, using {DEFAULT_API_KEY}");
            DEFAULT_API_KEY.to_string()
        });
        let jwt_secret =
            std::env::var("JWT_SECRET_KEY").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        Self {
            api_key,
            jwt_secret,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY, DEFAULT_JWT_SECRET)
    }
}

pub struct AppState {
    settings: Settings,
    users: RwLock<HashMap<String, String>>,
    books: RwLock<BTreeMap<u64, Book>>,
    next_id: AtomicU64,
}

pub type SharedState = Arc<AppState>;

pub fn app(settings: Settings) -> Router {
    let state: SharedState = Arc::new(AppState {
        settings,
        users: RwLock::new(HashMap::new()),
        books: RwLock::new(BTreeMap::new()),
        next_id: AtomicU64::new(1),
    });
    Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/books", get(list_books).post(create_book))
        .route(
            "/api/v1/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .route("/api/v1/", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, settings: Settings) -> Result<(), std::io::Error> {
    axum::serve(listener, app(settings)).await
}

pub fn issue_token(username: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: username.to_string(),
        exp: jsonwebtoken::get_current_timestamp() + TOKEN_TTL_SECS,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

/// Error response rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn book_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "book not found")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Username taken from a valid bearer token.
pub struct AuthUser(pub String);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| ApiFailure::unauthorized("Missing Authorization Header"))?;
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiFailure::unauthorized("Invalid Authorization Header"))?;
        let claims = decode_token(token, &state.settings.jwt_secret)
            .map_err(|_| ApiFailure::unauthorized("Invalid token"))?;
        Ok(AuthUser(claims.sub))
    }
}

async fn require_api_key(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if supplied == Some(state.settings.api_key.as_str()) {
        next.run(request).await
    } else {
        ApiFailure::unauthorized("Unauthorized").into_response()
    }
}

async fn health() -> Json<&'static str> {
    Json("ok")
}

async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<LoginUser>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let Json(user) = payload.map_err(|e| ApiFailure::bad_request(e.body_text()))?;
    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(ApiFailure::bad_request("username and password are required"));
    }
    let mut users = state.users.write().await;
    if users.contains_key(&user.username) {
        return Err(ApiFailure::new(StatusCode::CONFLICT, "username already registered"));
    }
    tracing::info!(username = %user.username, "registered user");
    users.insert(user.username, user.password);
    Ok(Json(json!({ "message": "Registration successful" })))
}

async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginUser>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let Json(user) = payload.map_err(|_| ApiFailure::bad_request("Bad Request"))?;
    let users = state.users.read().await;
    match users.get(&user.username) {
        Some(stored) if *stored == user.password => {}
        _ => return Err(ApiFailure::unauthorized("Invalid username or password")),
    }
    let token = issue_token(&user.username, &state.settings.jwt_secret).map_err(|e| {
        tracing::error!(error = %e, "failed to sign token");
        ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Error generating token")
    })?;
    Ok(Json(json!({ "token": token })))
}

async fn list_books(_user: AuthUser, State(state): State<SharedState>) -> Json<Envelope<Vec<Book>>> {
    let books = state.books.read().await;
    Json(Envelope {
        data: books.values().cloned().collect(),
    })
}

async fn create_book(
    _user: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Book>>), ApiFailure> {
    let Json(input) = payload.map_err(|e| ApiFailure::bad_request(e.body_text()))?;
    if input.author.trim().is_empty() || input.title.trim().is_empty() {
        return Err(ApiFailure::bad_request("author and title are required"));
    }
    let book = Book {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        title: input.title,
        author: input.author,
    };
    state.books.write().await.insert(book.id, book.clone());
    Ok((StatusCode::CREATED, Json(Envelope { data: book })))
}

async fn get_book(
    _user: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Book>>, ApiFailure> {
    let id = parse_id(&id)?;
    let books = state.books.read().await;
    books
        .get(&id)
        .cloned()
        .map(|data| Json(Envelope { data }))
        .ok_or_else(ApiFailure::book_not_found)
}

async fn update_book(
    _user: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Envelope<Book>>, ApiFailure> {
    let id = parse_id(&id)?;
    let mut books = state.books.write().await;
    let book = books.get_mut(&id).ok_or_else(ApiFailure::book_not_found)?;
    let Json(input) = payload.map_err(|e| ApiFailure::bad_request(e.body_text()))?;
    if let Some(title) = input.title {
        book.title = title;
    }
    if let Some(author) = input.author {
        book.author = author;
    }
    Ok(Json(Envelope { data: book.clone() }))
}

async fn delete_book(
    _user: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let id = parse_id(&id)?;
    let mut books = state.books.write().await;
    books
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(ApiFailure::book_not_found)
}

/// Ids that are not numbers cannot exist, so they read as missing books.
fn parse_id(raw: &str) -> Result<u64, ApiFailure> {
    raw.parse().map_err(|_| ApiFailure::book_not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_serializes_to_json() {
        let book = Book {
            id: 3,
            title: "1984".to_string(),
            author: "George Orwell".to_string(),
        };
        let json = serde_json::to_value(Envelope { data: book }).unwrap();
        assert_eq!(json["data"]["id"], 3);
        assert_eq!(json["data"]["title"], "1984");
        assert_eq!(json["data"]["author"], "George Orwell");
    }

    #[test]
    fn create_book_rejects_missing_author() {
        let result: Result<CreateBook, _> = serde_json::from_str(r#"{"title":"Only title"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_book_all_fields_optional() {
        let input: UpdateBook = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.author.is_none());
    }

    #[test]
    fn update_book_partial_fields() {
        let input: UpdateBook = serde_json::from_str(r#"{"author":"John Smith"}"#).unwrap();
        assert_eq!(input.author.as_deref(), Some("John Smith"));
        assert!(input.title.is_none());
    }

    #[test]
    fn issued_token_decodes_with_same_secret() {
        let token = issue_token("testuser", "s3cret").unwrap();
        let claims = decode_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "testuser");
        assert!(claims.exp > jsonwebtoken::get_current_timestamp());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("testuser", "s3cret").unwrap();
        assert!(decode_token(&token, "different").is_err());
    }

    #[test]
    fn non_numeric_id_reads_as_not_found() {
        let err = parse_id("abc").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(parse_id("12").unwrap(), 12);
    }
}
