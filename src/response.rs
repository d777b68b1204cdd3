//! Outgoing HTTP response type and the [`IntoReply`] conversion trait.
//!
//! Handlers do not have to build a [`Response`]. They return a value and the
//! dispatcher reduces it:
//!
//! | handler returns                         | status | content-type       | body              |
//! |-----------------------------------------|--------|--------------------|-------------------|
//! | `()`, `None`, JSON `null`               | 204    | —                  | empty             |
//! | `String`, `&'static str`                | 200*   | `text/html`        | the string        |
//! | `bool`, integers, floats                | 200*   | `text/html`        | textual form      |
//! | JSON object / array, [`Json`]           | 200*   | `application/json` | serialized value  |
//! | [`Response`]                            | as built                                        |
//! | `Err(e)` / [`HttpError`]                | `e.code()` | `text/html`    | `e.message()`     |
//!
//! \* unless the handler called
//! [`Request::set_response_code`](crate::Request::set_response_code).

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::HttpError;

pub(crate) const HTML: &str = "text/html";
pub(crate) const JSON: &str = "application/json";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use easyfied::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::html("<h1>hi</h1>");
/// Response::status(204);
///
/// Response::builder()
///     .status(301)
///     .header("location", "https://example.com/")
///     .no_body();
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().bytes(JSON, body)
    }

    /// `200 OK`, `text/html`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: u16) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: 200 }
    }

    pub fn status_code(&self) -> u16 { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the `http` response hyper writes to the wire.
    ///
    /// A status outside `100..=999` or an unencodable header cannot be sent;
    /// the caller gets a bare `500` instead and the problem is logged.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match builder.body(Full::new(Bytes::from(self.body))) {
            Ok(response) => response,
            Err(e) => {
                error!(status = self.status, "unable to encode response: {e}");
                let mut response = http::Response::new(Full::new(Bytes::new()));
                *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to 200. Terminated by a typed
/// body method, so you always know what you're sending.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: u16) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.bytes(JSON, body)
    }

    /// Terminate with an HTML body (`text/html`).
    pub fn html(self, body: impl Into<String>) -> Response {
        self.bytes(HTML, body.into().into_bytes())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with an arbitrary content type: files, listings, binary.
    pub fn bytes(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }

    /// Terminate with no body (e.g. 204, 301).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// The outcome of one handler call, before it is reduced to a [`Response`].
#[derive(Debug)]
pub enum Reply {
    /// Nothing was returned: `204 No Content`.
    Empty,
    /// A value to serialize: strings and scalars as HTML text, objects and
    /// arrays as JSON.
    Value(Value),
    /// A response built by the handler, sent untouched.
    Raw(Response),
    /// The handler failed.
    Failed(HttpError),
}

impl Reply {
    /// Reduces a successful reply to a response. `status` is the per-request
    /// code the handler may have set; it does not apply to empty replies or
    /// to raw responses.
    pub(crate) fn into_response(self, status: u16) -> Result<Response, HttpError> {
        match self {
            Reply::Empty | Reply::Value(Value::Null) => Ok(Response::status(204)),
            Reply::Value(Value::String(s)) => Ok(Response::builder().status(status).html(s)),
            Reply::Value(value @ (Value::Object(_) | Value::Array(_))) => {
                let body = serde_json::to_vec(&value)?;
                Ok(Response::builder().status(status).json(body))
            }
            Reply::Value(scalar) => Ok(Response::builder().status(status).html(scalar_text(&scalar))),
            Reply::Raw(response) => Ok(response),
            Reply::Failed(e) => Err(e),
        }
    }
}

/// Textual form of a scalar JSON value: `false`, `13.3`, and integral floats
/// without a trailing `.0`.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── IntoReply ─────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a [`Reply`].
///
/// Implement on your own types to return them directly from handlers.
///
/// # Example: domain type with its own status
///
/// ```rust
/// use easyfied::{IntoReply, Reply, Response};
///
/// struct Created(u64);
///
/// impl IntoReply for Created {
///     fn into_reply(self) -> Reply {
///         Reply::Raw(
///             Response::builder()
///                 .status(201)
///                 .header("location", &format!("/users/{}", self.0))
///                 .no_body(),
///         )
///     }
/// }
/// ```
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply { Reply::Empty }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply { Reply::Raw(self) }
}

impl IntoReply for Value {
    fn into_reply(self) -> Reply { Reply::Value(self) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply { Reply::Value(Value::String(self.to_owned())) }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply { Reply::Value(Value::String(self)) }
}

impl IntoReply for bool {
    fn into_reply(self) -> Reply { Reply::Value(Value::Bool(self)) }
}

macro_rules! number_reply {
    ($($t:ty),*) => {
        $(impl IntoReply for $t {
            fn into_reply(self) -> Reply { Reply::Value(Value::from(self)) }
        })*
    };
}

number_reply!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl IntoReply for HttpError {
    fn into_reply(self) -> Reply { Reply::Failed(self) }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        match self {
            Some(value) => value.into_reply(),
            None => Reply::Empty,
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<HttpError>,
{
    fn into_reply(self) -> Reply {
        match self {
            Ok(value) => value.into_reply(),
            Err(e) => Reply::Failed(e.into()),
        }
    }
}

/// Serializes any `T: Serialize` through serde_json.
///
/// Objects and arrays are sent as `application/json`; a `T` that serializes
/// to a scalar follows the scalar rules (text, or 204 for `null`).
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Reply {
        match serde_json::to_value(&self.0) {
            Ok(value) => Reply::Value(value),
            Err(e) => Reply::Failed(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reduce(value: impl IntoReply) -> Response {
        value.into_reply().into_response(200).unwrap()
    }

    #[test]
    fn strings_and_scalars_are_html_text() {
        let response = reduce("hello world");
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.body(), b"hello world");

        assert_eq!(reduce(false).body(), b"false");
        assert_eq!(reduce(13.3).body(), b"13.3");
        assert_eq!(reduce(2.0).body(), b"2");
        assert_eq!(reduce(-7_i64).body(), b"-7");
    }

    #[test]
    fn nothing_means_no_content() {
        assert_eq!(reduce(()).status_code(), 204);
        assert_eq!(reduce(None::<String>).status_code(), 204);
        assert_eq!(reduce(Value::Null).status_code(), 204);
        assert!(reduce(()).body().is_empty());
    }

    #[test]
    fn objects_are_json() {
        let response = reduce(json!({"name": "mister"}));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.body(), br#"{"name":"mister"}"#);

        #[derive(Serialize)]
        struct Pet { id: u32 }
        assert_eq!(reduce(Json(vec![Pet { id: 1 }])).body(), br#"[{"id":1}]"#);
    }

    #[test]
    fn custom_status_applies_to_values_only() {
        let response = "".into_reply().into_response(201).unwrap();
        assert_eq!(response.status_code(), 201);

        let response = ().into_reply().into_response(201).unwrap();
        assert_eq!(response.status_code(), 204);
    }

    #[test]
    fn errors_pass_through() {
        let reply = Err::<String, _>(HttpError::not_found("gone")).into_reply();
        let err = reply.into_response(200).unwrap_err();
        assert_eq!(err.code(), 404);
    }

    #[test]
    fn unencodable_status_falls_back_to_500() {
        let inner = Response::status(1000).into_inner();
        assert_eq!(inner.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
