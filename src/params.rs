//! Declared handler parameters and their per-request resolution.
//!
//! A route declares, at registration time, the ordered list of values its
//! handler wants. At dispatch the list is resolved against the request and
//! handed to the handler positionally through
//! [`Request::args`](crate::Request::args).
//!
//! Declare them with the builder:
//!
//! ```rust
//! use easyfied::{Param, Params, Source};
//!
//! let params = Params::new()
//!     .required("name")
//!     .with_default("title", "Mr")
//!     .with(Param::required("id").from(Source::Uri));
//! assert_eq!(params.len(), 3);
//! ```
//!
//! or from a declared signature, where a parameter is required unless it has
//! a default value:
//!
//! ```rust
//! use easyfied::Params;
//!
//! let params = Params::from_signature("name: string, title = 'Mr', _headers");
//! assert!(params.get("name").unwrap().is_required());
//! assert!(!params.get("title").unwrap().is_required());
//! ```

use std::collections::HashMap;

use http::HeaderMap;
use serde_json::{Map, Value};

use crate::error::{HttpError, MISSING_PARAMETER};

/// Where a parameter's value comes from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Source {
    /// Path captures first, then the query string for `GET` requests or the
    /// parsed body for every other method.
    #[default]
    Any,
    Query,
    Body,
    /// A `:name` capture of the route path.
    Uri,
    /// The request method as a string (`_method` in signatures).
    Method,
    /// The request headers as an object of lowercase names (`_headers`).
    Headers,
    /// The call context (`_req`, `_res`, `_server`). Handlers reach it
    /// through their [`Request`](crate::Request); the slot is always
    /// present and holds `null`.
    Context,
}

/// One declared parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    name: String,
    required: bool,
    default: Option<Value>,
    source: Source,
}

impl Param {
    /// A parameter whose absence rejects the request with a 400.
    pub fn required(name: impl Into<String>) -> Self {
        Self { name: name.into(), required: true, default: None, source: Source::Any }
    }

    /// A parameter that may be absent; its slot is then `None`.
    pub fn optional(name: impl Into<String>) -> Self {
        Self { required: false, ..Self::required(name) }
    }

    /// An optional parameter that falls back to `default` when absent.
    pub fn with_default(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self { default: Some(default.into()), ..Self::optional(name) }
    }

    /// Restricts where the value is looked up.
    pub fn from(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn is_required(&self) -> bool { self.required }
    pub fn default(&self) -> Option<&Value> { self.default.as_ref() }
    pub fn source(&self) -> Source { self.source }
}

/// The ordered parameter list of one route.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.with(Param::required(name))
    }

    pub fn optional(self, name: impl Into<String>) -> Self {
        self.with(Param::optional(name))
    }

    pub fn with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.with(Param::with_default(name, default))
    }

    /// Derives the parameter list from a declared signature such as
    /// `"(name: string, title = 'Mr', _headers)"`.
    ///
    /// - parameters are separated by commas; surrounding parentheses and
    ///   `: Type` annotations are ignored,
    /// - `name = value` declares a default, parsed as JSON when possible and
    ///   kept as text otherwise (single quotes are stripped), which makes the
    ///   parameter optional,
    /// - `_method` and `_headers` bind the request method and headers,
    /// - with `lowercase`, names are lowercased.
    pub fn introspect(signature: &str, lowercase: bool) -> Self {
        let mut signature = signature.trim();
        if let Some(inner) = signature.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            signature = inner;
        }

        let params = split_top_level(signature)
            .into_iter()
            .filter_map(|element| parse_element(element, lowercase))
            .collect();
        Self { params }
    }

    /// [`Params::introspect`] with lowercase names.
    pub fn from_signature(signature: &str) -> Self {
        Self::introspect(signature, true)
    }

    pub fn len(&self) -> usize { self.params.len() }
    pub fn is_empty(&self) -> bool { self.params.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &Param> { self.params.iter() }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Resolves every declared parameter, in declaration order.
    ///
    /// Absent optional parameters keep their slot (`None`, or their default)
    /// so positions never shift. All absent required parameters are reported
    /// together in one 400.
    pub(crate) fn resolve(&self, inputs: &Inputs<'_>) -> Result<Vec<Option<Value>>, HttpError> {
        let mut values = Vec::with_capacity(self.params.len());
        let mut missing = Vec::new();

        for param in &self.params {
            let value = inputs.lookup(&param.name.to_lowercase(), param.source);
            match value.or_else(|| param.default.clone()) {
                Some(v) => values.push(Some(v)),
                None if param.required => {
                    missing.push(param.name.as_str());
                    values.push(None);
                }
                None => values.push(None),
            }
        }

        if missing.is_empty() {
            Ok(values)
        } else {
            Err(HttpError::bad_request(format!("{MISSING_PARAMETER}{}", missing.join(","))))
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter { self.params.iter() }
}

// ── Resolution inputs ─────────────────────────────────────────────────────────

/// Everything a parameter can be resolved from, borrowed from one request.
pub(crate) struct Inputs<'a> {
    pub method: &'a http::Method,
    pub headers: &'a HeaderMap,
    /// Query parameters, keys already lowercased.
    pub query: &'a Map<String, Value>,
    pub body: &'a Value,
    pub captures: &'a HashMap<String, String>,
}

impl Inputs<'_> {
    /// `key` is lowercase. Present-but-null values count as present.
    fn lookup(&self, key: &str, source: Source) -> Option<Value> {
        match source {
            Source::Any => self.capture(key).or_else(|| {
                if self.method == http::Method::GET {
                    self.query.get(key).cloned()
                } else {
                    self.body_field(key)
                }
            }),
            Source::Query => self.query.get(key).cloned(),
            Source::Body => self.body_field(key),
            Source::Uri => self.capture(key),
            Source::Method => Some(Value::String(self.method.as_str().to_owned())),
            Source::Headers => Some(headers_object(self.headers)),
            Source::Context => Some(Value::Null),
        }
    }

    fn capture(&self, key: &str) -> Option<Value> {
        self.captures.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, v)| Value::String(v.clone()))
    }

    fn body_field(&self, key: &str) -> Option<Value> {
        self.body.as_object()?
            .iter()
            .find(|(name, _)| name.to_lowercase() == key)
            .map(|(_, v)| v.clone())
    }
}

/// Headers as a JSON object. Repeated headers are joined with `", "`.
pub(crate) fn headers_object(headers: &HeaderMap) -> Value {
    let mut object = Map::new();
    for name in headers.keys() {
        let joined = headers.get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        object.insert(name.as_str().to_owned(), Value::String(joined));
    }
    Value::Object(object)
}

// ── Signature parsing ─────────────────────────────────────────────────────────

/// Splits on commas that are not nested in brackets or quotes.
fn split_top_level(signature: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in signature.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'' | '`') => quote = Some(c),
            (None, '(' | '[' | '{' | '<') => depth += 1,
            (None, ')' | ']' | '}' | '>') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&signature[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&signature[start..]);
    parts
}

fn parse_element(element: &str, lowercase: bool) -> Option<Param> {
    let (declared, default) = match element.split_once('=') {
        Some((declared, default)) => (declared, Some(parse_default(default.trim()))),
        None => (element, None),
    };

    let name = declared.split(':').next().unwrap_or_default().trim();
    if name.is_empty() {
        return None;
    }
    let name = if lowercase { name.to_lowercase() } else { name.to_owned() };

    let source = match name.to_lowercase().as_str() {
        "_method" => Source::Method,
        "_headers" => Source::Headers,
        "_req" | "_res" | "_server" => Source::Context,
        _ => Source::Any,
    };

    let param = match default {
        Some(default) => Param::with_default(name, default),
        None => Param::required(name),
    };
    Some(param.from(source))
}

fn parse_default(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str(text) {
        return value;
    }
    let unquoted = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\''));
    Value::String(unquoted.unwrap_or(text).to_owned())
}
