//! Incoming request: target parsing, body parsing, and the per-call
//! [`Request`] handed to handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{HttpError, MISSING_PARAMETER, UNABLE_TO_PARSE_JSON};
use crate::params::Params;
use crate::server::Server;

// ── UrlInfo ──────────────────────────────────────────────────────────────────

/// The request target, split into path and query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UrlInfo {
    /// Trimmed, lowercased path, for handlers that compare paths without
    /// caring about case. Dispatch itself never reads it: patterns are
    /// case-insensitive and run on `raw_route`.
    pub route: String,
    /// The path as received. Routes match against this one so that captures
    /// keep their case.
    pub raw_route: String,
    /// Query parameters. Keys are lowercased, values percent-decoded, and a
    /// key without `=` maps to `null`. The last duplicate wins.
    pub query: Map<String, Value>,
    /// The query string as received, without the `?`.
    pub raw_query: Option<String>,
}

impl UrlInfo {
    pub fn parse(uri: &http::Uri) -> Self {
        Self::from_parts(uri.path(), uri.query())
    }

    /// Parses a raw target such as `/hello?name=Mister`.
    pub fn from_target(target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => Self::from_parts(path, Some(query)),
            None => Self::from_parts(target, None),
        }
    }

    fn from_parts(path: &str, query: Option<&str>) -> Self {
        let raw_route = path.trim().to_owned();
        Self {
            route: raw_route.to_lowercase(),
            raw_route,
            query: query.map(parse_query).unwrap_or_default(),
            raw_query: query.filter(|q| !q.is_empty()).map(str::to_owned),
        }
    }
}

fn parse_query(query: &str) -> Map<String, Value> {
    let mut params = Map::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, Value::String(decode(value))),
            None => (pair, Value::Null),
        };
        params.insert(decode(key).to_lowercase(), value);
    }
    params
}

/// Form-style percent-decoding; undecodable input is kept as-is.
fn decode(text: &str) -> String {
    let text = text.replace('+', " ");
    match urlencoding::decode(&text) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => text,
    }
}

// ── Body ─────────────────────────────────────────────────────────────────────

/// Parses a fully-read body.
///
/// A JSON content type (`application/json`, parameters ignored) is parsed as
/// JSON; an empty JSON body is `null`. Anything else is wrapped as
/// `{"body": "<text>"}`.
pub fn parse_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Value, HttpError> {
    if is_json(content_type) {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(bytes).map_err(|_| HttpError::bad_request(UNABLE_TO_PARSE_JSON));
    }
    let mut wrapper = Map::new();
    wrapper.insert("body".to_owned(), Value::String(String::from_utf8_lossy(bytes).into_owned()));
    Ok(Value::Object(wrapper))
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

// ── Request ──────────────────────────────────────────────────────────────────

/// What every handler of one request shares.
pub(crate) struct Incoming {
    pub method: http::Method,
    pub url: UrlInfo,
    pub headers: HeaderMap,
    pub body: Value,
    pub status: AtomicU16,
    pub server: Option<Arc<Server>>,
}

impl Incoming {
    pub(crate) fn new(
        method: http::Method,
        url: UrlInfo,
        headers: HeaderMap,
        body: Value,
        server: Option<Arc<Server>>,
    ) -> Self {
        Self { method, url, headers, body, status: AtomicU16::new(200), server }
    }

    pub(crate) fn response_code(&self) -> u16 {
        self.status.load(Ordering::Relaxed)
    }
}

/// The request as seen by one handler call.
///
/// Middleware and the terminal handler of the same request each get their
/// own `Request`, but they share the underlying request data and the
/// response code set through [`Request::set_response_code`].
pub struct Request {
    incoming: Arc<Incoming>,
    captures: HashMap<String, String>,
    params: Arc<Params>,
    args: Vec<Option<Value>>,
}

impl Request {
    pub(crate) fn new(
        incoming: Arc<Incoming>,
        captures: HashMap<String, String>,
        params: Arc<Params>,
        args: Vec<Option<Value>>,
    ) -> Self {
        Self { incoming, captures, params, args }
    }

    pub fn method(&self) -> &http::Method { &self.incoming.method }
    pub fn headers(&self) -> &HeaderMap { &self.incoming.headers }
    pub fn url(&self) -> &UrlInfo { &self.incoming.url }

    /// The path as received.
    pub fn path(&self) -> &str { &self.incoming.url.raw_route }

    pub fn query(&self) -> &Map<String, Value> { &self.incoming.url.query }

    /// The parsed body: JSON, or `{"body": "<text>"}`.
    pub fn body(&self) -> &Value { &self.incoming.body }

    /// Case-insensitive header lookup. Non-text values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.incoming.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a `:name` capture of the matched route path.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.captures.get(name)
            .or_else(|| {
                self.captures.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Resolved parameters, in declaration order. Absent optional parameters
    /// are `None`.
    pub fn args(&self) -> &[Option<Value>] {
        &self.args
    }

    /// A resolved parameter by declared name (case-insensitive).
    pub fn arg(&self, name: &str) -> Option<&Value> {
        let position = self.params.position(name)?;
        self.args.get(position)?.as_ref()
    }

    /// Deserializes a resolved parameter. Absent parameters deserialize from
    /// `null`, so `Option<T>` reads optional ones.
    pub fn arg_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, HttpError> {
        match self.arg(name) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| HttpError::bad_request(format!("Invalid parameter {name}: {e}"))),
            None => serde_json::from_value(Value::Null)
                .map_err(|_| HttpError::bad_request(format!("{MISSING_PARAMETER}{name}"))),
        }
    }

    /// The server that received this request. `None` only for requests
    /// dispatched outside a server.
    pub fn server(&self) -> Option<&Arc<Server>> {
        self.incoming.server.as_ref()
    }

    /// Sets the status of this request's successful response. Defaults to
    /// 200; empty replies stay 204 and errors keep their own code.
    pub fn set_response_code(&self, code: u16) {
        self.incoming.status.store(code, Ordering::Relaxed);
    }

    pub fn response_code(&self) -> u16 {
        self.incoming.response_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_path_is_lowercased_but_raw_path_kept() {
        let url = UrlInfo::from_target(" /Hello/World ?a=1");
        assert_eq!(url.route, "/hello/world");
        assert_eq!(url.raw_route, "/Hello/World");
        assert_eq!(url.raw_query.as_deref(), Some("a=1"));
    }

    #[test]
    fn query_keys_lowercased_values_decoded() {
        let url = UrlInfo::from_target("/x?Name=Mister%20T&flag&title=Dr+Who&name=last");
        assert_eq!(url.query["name"], json!("last"));
        assert_eq!(url.query["flag"], Value::Null);
        assert_eq!(url.query["title"], json!("Dr Who"));
        assert!(!url.query.contains_key("Name"));
    }

    #[test]
    fn no_query() {
        let url = UrlInfo::from_target("/plain");
        assert!(url.query.is_empty());
        assert_eq!(url.raw_query, None);
    }

    #[test]
    fn json_body_by_media_type() {
        let body = parse_body(Some("application/json; charset=utf-8"), br#"{"a": 1}"#).unwrap();
        assert_eq!(body, json!({"a": 1}));

        let body = parse_body(Some("Application/JSON"), b"[1,2]").unwrap();
        assert_eq!(body, json!([1, 2]));
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let err = parse_body(Some("application/json"), b"{nope").unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(err.message(), UNABLE_TO_PARSE_JSON);
    }

    #[test]
    fn other_bodies_are_wrapped() {
        assert_eq!(parse_body(Some("text/plain"), b"hi").unwrap(), json!({"body": "hi"}));
        assert_eq!(parse_body(None, b"").unwrap(), json!({"body": ""}));
        assert_eq!(parse_body(Some("application/json-patch"), b"x").unwrap(), json!({"body": "x"}));
    }

    fn request(params: Params, args: Vec<Option<Value>>) -> Request {
        let incoming = Incoming::new(
            http::Method::GET,
            UrlInfo::from_target("/users/42"),
            HeaderMap::new(),
            Value::Null,
            None,
        );
        let captures = HashMap::from([("id".to_owned(), "42".to_owned())]);
        Request::new(Arc::new(incoming), captures, Arc::new(params), args)
    }

    #[test]
    fn args_by_name_and_type() {
        let params = Params::new().required("Count").optional("label");
        let req = request(params, vec![Some(json!(3)), None]);

        assert_eq!(req.arg("count"), Some(&json!(3)));
        assert_eq!(req.arg_as::<u32>("COUNT").unwrap(), 3);
        assert_eq!(req.arg_as::<Option<String>>("label").unwrap(), None);
        assert!(req.arg_as::<String>("label").is_err());
        assert_eq!(req.arg_as::<String>("count").unwrap_err().code(), 400);
    }

    #[test]
    fn captures_and_response_code() {
        let req = request(Params::new(), Vec::new());
        assert_eq!(req.param("id"), Some("42"));
        assert_eq!(req.param("ID"), Some("42"));
        assert_eq!(req.response_code(), 200);
        req.set_response_code(201);
        assert_eq!(req.response_code(), 201);
    }
}
