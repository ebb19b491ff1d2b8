//! Stateless HTTP request builder and response parser for the books API.
//!
//! # Design
//! `BooksClient` holds the base URL and the static API key and carries no
//! mutable state between calls. Each wire call is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. `send` performs the round-trip through a `Transport`
//! and tags transport failures with the operation in flight.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use crate::types::{
    Book, BookId, BookInput, Credentials, DataEnvelope, Registration, Session, TokenResponse,
};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const CONTENT_TYPE_HEADER: &str = "content-type";

/// Bytes escaped when a book id becomes a single path segment.
const ID_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Synchronous, stateless client for the books API.
#[derive(Clone)]
pub struct BooksClient {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for BooksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooksClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BooksClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- build ---------------------------------------------------------------

    /// `GET /` needs no API key.
    pub fn build_health_check(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_register(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/register", None, credentials)
    }

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/login", None, credentials)
    }

    pub fn build_create_book(
        &self,
        session: &Session,
        input: &BookInput,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/books", Some(session), input)
    }

    pub fn build_list_books(&self, session: &Session) -> HttpRequest {
        self.bare_request(HttpMethod::Get, "/books".to_string(), session)
    }

    pub fn build_get_book(&self, session: &Session, id: &BookId) -> HttpRequest {
        self.bare_request(HttpMethod::Get, book_route(id), session)
    }

    pub fn build_update_book(
        &self,
        session: &Session,
        id: &BookId,
        input: &BookInput,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &book_route(id), Some(session), input)
    }

    pub fn build_delete_book(&self, session: &Session, id: &BookId) -> HttpRequest {
        self.bare_request(HttpMethod::Delete, book_route(id), session)
    }

    // -- parse ---------------------------------------------------------------

    pub fn parse_health_check(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.status == 200 {
            return Ok(());
        }
        Err(ApiError::HealthCheck {
            status: response.status,
            body: response.body,
        })
    }

    /// 200 and 201 mean a new account, 409 means the username was taken.
    pub fn parse_register(&self, response: HttpResponse) -> Result<Registration, ApiError> {
        match response.status {
            200 | 201 => Ok(Registration::Created),
            409 => Ok(Registration::AlreadyExists),
            status => Err(ApiError::Registration {
                status,
                body: response.body,
            }),
        }
    }

    pub fn parse_login(&self, response: HttpResponse, username: &str) -> Result<Session, ApiError> {
        if response.status != 200 {
            return Err(ApiError::Authentication {
                status: response.status,
                reason: response.body,
            });
        }
        let parsed: TokenResponse = decode(Operation::Login, &response.body)?;
        let token = parsed.token.ok_or_else(|| ApiError::Authentication {
            status: response.status,
            reason: "response has no token field".to_string(),
        })?;
        Session::new(username, token)
    }

    pub fn parse_create_book(&self, response: HttpResponse) -> Result<Book, ApiError> {
        if response.status != 201 {
            return Err(ApiError::Create {
                status: response.status,
                body: response.body,
            });
        }
        decode::<DataEnvelope<Book>>(Operation::CreateBook, &response.body).map(|env| env.data)
    }

    pub fn parse_list_books(&self, response: HttpResponse) -> Result<Vec<Book>, ApiError> {
        if response.status != 200 {
            return Err(ApiError::List {
                status: response.status,
                body: response.body,
            });
        }
        decode::<DataEnvelope<Vec<Book>>>(Operation::ListBooks, &response.body).map(|env| env.data)
    }

    pub fn parse_get_book(&self, response: HttpResponse) -> Result<Book, ApiError> {
        match response.status {
            200 => decode::<DataEnvelope<Book>>(Operation::GetBook, &response.body)
                .map(|env| env.data),
            404 => Err(ApiError::NotFound),
            status => Err(ApiError::UnexpectedStatus {
                operation: Operation::GetBook,
                expected: 200,
                status,
                body: response.body,
            }),
        }
    }

    pub fn parse_update_book(&self, response: HttpResponse) -> Result<Book, ApiError> {
        if response.status != 200 {
            return Err(ApiError::Update {
                status: response.status,
                body: response.body,
            });
        }
        decode::<DataEnvelope<Book>>(Operation::UpdateBook, &response.body).map(|env| env.data)
    }

    pub fn parse_delete_book(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.status != 204 {
            return Err(ApiError::Delete {
                status: response.status,
                body: response.body,
            });
        }
        Ok(())
    }

    // -- helpers -------------------------------------------------------------

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        route: &str,
        session: Option<&Session>,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut headers = vec![(
            CONTENT_TYPE_HEADER.to_string(),
            "application/json".to_string(),
        )];
        headers.extend(self.auth_headers(session));
        Ok(HttpRequest {
            method,
            path: format!("{}{route}", self.base_url),
            headers,
            body: Some(body),
        })
    }

    fn bare_request(&self, method: HttpMethod, route: String, session: &Session) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{route}", self.base_url),
            headers: self.auth_headers(Some(session)),
            body: None,
        }
    }

    fn auth_headers(&self, session: Option<&Session>) -> Vec<(String, String)> {
        let mut headers = vec![(API_KEY_HEADER.to_string(), self.api_key.clone())];
        if let Some(session) = session {
            headers.push((AUTHORIZATION_HEADER.to_string(), session.bearer()));
        }
        headers
    }
}

/// Execute `request` once, mapping a failed round-trip onto `ApiError`.
pub fn send<T: Transport + ?Sized>(
    transport: &T,
    operation: Operation,
    request: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    transport.execute(request).map_err(|e| match e {
        TransportError::Timeout => ApiError::Timeout { operation },
        TransportError::Io(message) => ApiError::Transport { operation, message },
    })
}

/// `/books/{id}` with the id escaped so it can never leave its segment.
fn book_route(id: &BookId) -> String {
    let raw = id.to_string();
    let segment = match raw.as_str() {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        other => utf8_percent_encode(other, ID_SEGMENT).to_string(),
    };
    format!("/books/{segment}")
}

fn decode<T: DeserializeOwned>(operation: Operation, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Schema {
        operation,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BooksClient {
        BooksClient::new("http://localhost:8001/api/v1", "secret-key")
    }

    fn session() -> Session {
        Session::new("testuser", "header.payload.signature").unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_register_carries_api_key_but_no_bearer() {
        let req = client()
            .build_register(&Credentials::new("testuser", "securepassword"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8001/api/v1/register");
        assert_eq!(req.header("X-API-Key"), Some("secret-key"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("authorization").is_none());
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["username"], "testuser");
        assert_eq!(body["password"], "securepassword");
    }

    #[test]
    fn build_health_check_has_no_headers() {
        let req = client().build_health_check();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:8001/api/v1/");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_create_book_produces_correct_request() {
        let req = client()
            .build_create_book(&session(), &BookInput::new("Jane Doe", "New Book Title"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8001/api/v1/books");
        assert_eq!(
            req.headers,
            vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("x-api-key".to_string(), "secret-key".to_string()),
                (
                    "authorization".to_string(),
                    "Bearer header.payload.signature".to_string()
                ),
            ]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["author"], "Jane Doe");
        assert_eq!(body["title"], "New Book Title");
    }

    #[test]
    fn build_get_book_renders_plain_ids_unchanged() {
        let c = client();
        let numeric = c.build_get_book(&session(), &BookId::from(42));
        assert_eq!(numeric.path, "http://localhost:8001/api/v1/books/42");
        let text = c.build_get_book(&session(), &BookId::from("abc-1"));
        assert_eq!(text.path, "http://localhost:8001/api/v1/books/abc-1");
        assert!(text.body.is_none());
        assert_eq!(
            text.header("authorization"),
            Some("Bearer header.payload.signature")
        );
    }

    #[test]
    fn book_ids_are_escaped_as_one_segment() {
        let c = client();
        let cases = [
            ("a/b", "/books/a%2Fb"),
            ("x?y=1", "/books/x%3Fy=1"),
            ("../register", "/books/..%2Fregister"),
            ("..", "/books/%2E%2E"),
            ("50% off#1", "/books/50%25%20off%231"),
        ];
        for (id, route) in cases {
            let id = BookId::from(id);
            let expected = format!("http://localhost:8001/api/v1{route}");
            assert_eq!(c.build_get_book(&session(), &id).path, expected);
            assert_eq!(c.build_delete_book(&session(), &id).path, expected);
            let update = c
                .build_update_book(&session(), &id, &BookInput::new("a", "t"))
                .unwrap();
            assert_eq!(update.path, expected);
        }
    }

    #[test]
    fn build_update_and_delete_use_book_path() {
        let c = client();
        let id = BookId::from(7);
        let update = c
            .build_update_book(&session(), &id, &BookInput::new("John Smith", "Updated"))
            .unwrap();
        assert_eq!(update.method, HttpMethod::Put);
        assert_eq!(update.path, "http://localhost:8001/api/v1/books/7");
        let delete = c.build_delete_book(&session(), &id);
        assert_eq!(delete.method, HttpMethod::Delete);
        assert_eq!(delete.path, "http://localhost:8001/api/v1/books/7");
        assert!(delete.body.is_none());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let c = BooksClient::new("http://localhost:8001/api/v1/", "k");
        assert_eq!(c.build_list_books(&session()).path, "http://localhost:8001/api/v1/books");
    }

    #[test]
    fn parse_register_accepts_existing_user() {
        let c = client();
        assert_eq!(c.parse_register(response(200, "{}")).unwrap(), Registration::Created);
        assert_eq!(c.parse_register(response(201, "{}")).unwrap(), Registration::Created);
        assert_eq!(
            c.parse_register(response(409, r#"{"error":"exists"}"#)).unwrap(),
            Registration::AlreadyExists
        );
        let err = c.parse_register(response(500, "boom")).unwrap_err();
        assert!(matches!(err, ApiError::Registration { status: 500, .. }));
    }

    #[test]
    fn parse_login_returns_session() {
        let session = client()
            .parse_login(response(200, r#"{"token":"a.b.c"}"#), "testuser")
            .unwrap();
        assert_eq!(session.token(), "a.b.c");
        assert_eq!(session.username(), "testuser");
    }

    #[test]
    fn parse_login_without_token_is_authentication_error() {
        let err = client()
            .parse_login(response(200, r#"{"message":"hi"}"#), "testuser")
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication { status: 200, .. }));

        let err = client()
            .parse_login(response(200, r#"{"token":""}"#), "testuser")
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication { .. }));
    }

    #[test]
    fn parse_login_wrong_status() {
        let err = client()
            .parse_login(response(401, r#"{"error":"Invalid username or password"}"#), "u")
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication { status: 401, .. }));
    }

    #[test]
    fn parse_create_book_success() {
        let book = client()
            .parse_create_book(response(
                201,
                r#"{"data":{"id":1,"author":"Jane Doe","title":"New Book Title","created_at":"x"}}"#,
            ))
            .unwrap();
        assert_eq!(book.id, BookId::Numeric(1));
        assert_eq!(book.author, "Jane Doe");
    }

    #[test]
    fn parse_create_book_wrong_status() {
        let err = client()
            .parse_create_book(response(500, "internal error"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Create { status: 500, .. }));
    }

    #[test]
    fn parse_create_book_missing_id_is_schema_error() {
        let err = client()
            .parse_create_book(response(201, r#"{"data":{"author":"a","title":"t"}}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Schema {
                operation: Operation::CreateBook,
                ..
            }
        ));
    }

    #[test]
    fn parse_list_books_requires_data_field() {
        let c = client();
        let books = c
            .parse_list_books(response(200, r#"{"data":[{"id":"x","author":"a","title":"t"}]}"#))
            .unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, BookId::from("x"));

        let err = c.parse_list_books(response(200, "[]")).unwrap_err();
        assert!(matches!(err, ApiError::Schema { .. }));

        let err = c.parse_list_books(response(401, "")).unwrap_err();
        assert!(matches!(err, ApiError::List { status: 401, .. }));
    }

    #[test]
    fn parse_get_book_not_found() {
        let err = client().parse_get_book(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_get_book_other_status() {
        let err = client().parse_get_book(response(500, "oops")).unwrap_err();
        assert!(matches!(
            err,
            ApiError::UnexpectedStatus {
                status: 500,
                expected: 200,
                ..
            }
        ));
    }

    #[test]
    fn parse_update_book_wrong_status() {
        let err = client().parse_update_book(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::Update { status: 404, .. }));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn parse_delete_book() {
        let c = client();
        assert!(c.parse_delete_book(response(204, "")).is_ok());
        let err = c.parse_delete_book(response(200, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::Delete { status: 200, .. }));
    }

    struct FailingTransport(TransportError);

    impl Transport for FailingTransport {
        fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(self.0.clone())
        }
    }

    #[test]
    fn send_tags_timeout_with_operation() {
        let err = send(
            &FailingTransport(TransportError::Timeout),
            Operation::ListBooks,
            client().build_list_books(&session()),
        )
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            ApiError::Timeout {
                operation: Operation::ListBooks
            }
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?} {:?}", client(), session());
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("header.payload.signature"));
    }
}
