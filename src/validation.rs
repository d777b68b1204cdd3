//! A small composable validation DSL.
//!
//! A [`Rule`] is a predicate over a JSON value plus a human-readable
//! description of what it expects. Rules compose with [`and`], [`or`] and
//! [`not`], and the descriptions nest accordingly.
//!
//! ```rust
//! use easyfied::validation::{and, greater_or_equal, is_array, is_number, or, validate};
//! use serde_json::json;
//!
//! let rule = or(vec![is_array(2), and(vec![is_number(), greater_or_equal(5.0)])]);
//! assert!(validate(&json!(12), &rule).is_ok());
//! assert!(validate(&json!("a"), &rule).is_err());
//! ```
//!
//! A [`Validator`] accumulates rules fluently under a name, which is what the
//! error message shows instead of the offending value:
//!
//! ```rust
//! use easyfied::Validator;
//! use serde_json::json;
//!
//! let age = Validator::new("age").is_number().not().greater_or_equal(150.0);
//! let err = age.validate(&json!(200)).unwrap_err();
//! assert_eq!(err.code(), 400);
//! assert!(err.message().starts_with("Validation error: age  AND : "));
//! ```
//!
//! Ordering rules compare numerically: numbers are used as-is, strings are
//! parsed after trimming, booleans count as 1 and 0. Anything else is not
//! comparable and fails every ordering rule.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::HttpError;
use crate::response::scalar_text;

// ── Rule ──────────────────────────────────────────────────────────────────────

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// A described predicate. Cheap to clone.
#[derive(Clone)]
pub struct Rule {
    description: Arc<str>,
    predicate: Arc<Predicate>,
}

impl Rule {
    /// A custom rule. The description is fixed for the rule's lifetime.
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { description: description.into().into(), predicate: Arc::new(predicate) }
    }

    /// The rule that accepts everything.
    pub fn always() -> Self {
        Self::new("", |_| true)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rule").field(&self.description).finish()
    }
}

impl std::ops::Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        not(self)
    }
}

// ── Leaf rules ────────────────────────────────────────────────────────────────

/// Strict equality. Numbers compare by value (`2` equals `2.0`), everything
/// else structurally; a string never equals a number.
pub fn equal(expected: impl Into<Value>) -> Rule {
    let expected = expected.into();
    Rule::new(format!("equal to {expected}"), move |value| strict_eq(value, &expected))
}

pub fn greater_than(bound: f64) -> Rule {
    Rule::new(format!("greater than {bound}"), move |v| as_number(v).is_some_and(|n| n > bound))
}

pub fn greater_or_equal(bound: f64) -> Rule {
    Rule::new(format!("greater than or equal to {bound}"), move |v| {
        as_number(v).is_some_and(|n| n >= bound)
    })
}

pub fn less_than(bound: f64) -> Rule {
    Rule::new(format!("less than {bound}"), move |v| as_number(v).is_some_and(|n| n < bound))
}

pub fn less_or_equal(bound: f64) -> Rule {
    Rule::new(format!("less than or equal to {bound}"), move |v| {
        as_number(v).is_some_and(|n| n <= bound)
    })
}

/// Inclusive on both ends.
pub fn between(min: f64, max: f64) -> Rule {
    Rule::new(format!("between {min} and {max}"), move |v| {
        as_number(v).is_some_and(|n| n >= min && n <= max)
    })
}

/// Checks the value's type tag: `number`, `string`, `boolean`, `object`
/// (objects and arrays alike) or `null`.
pub fn is_of_type(type_name: &str) -> Rule {
    let expected = type_name.to_owned();
    Rule::new(format!("of type {type_name}"), move |v| type_tag(v) == expected)
}

pub fn is_number() -> Rule {
    is_of_type("number")
}

/// Objects and arrays.
pub fn is_object() -> Rule {
    is_of_type("object")
}

/// A string whose length (in characters) is within `min..=max`, where `0`
/// leaves that side unbounded. With both at `0` this is a plain type check.
pub fn is_string(min: usize, max: usize) -> Rule {
    let description = match (min, max) {
        (0, 0) => return is_of_type("string"),
        (min, max) if min == max => format!("a string of length: {min}"),
        (min, 0) => format!("a string of minimal length: {min}"),
        (0, max) => format!("a string of maximum length: {max}"),
        (min, max) => format!("a string with a length between: {min} and {max}"),
    };
    Rule::new(description, move |v| {
        v.as_str().is_some_and(|s| {
            let len = s.chars().count();
            (min == 0 || len >= min) && (max == 0 || len <= max)
        })
    })
}

/// The value's text matches `pattern`. A pattern that does not compile
/// yields a rule that rejects everything.
pub fn matches_pattern(pattern: &str) -> Rule {
    let regex = Regex::new(pattern).ok();
    Rule::new(format!("with format {pattern}"), move |v| {
        let Some(regex) = &regex else { return false };
        match v {
            Value::String(s) => regex.is_match(s),
            Value::Number(_) | Value::Bool(_) => regex.is_match(&scalar_text(v)),
            _ => false,
        }
    })
}

/// An array of at least `min_len` elements; a negative `min_len` accepts any
/// array.
pub fn is_array(min_len: i64) -> Rule {
    let description = if min_len < 0 {
        "an array".to_owned()
    } else {
        format!("an array of minimal length: {min_len}")
    };
    Rule::new(description, move |v| {
        v.as_array().is_some_and(|items| {
            usize::try_from(min_len).map_or(true, |min| items.len() >= min)
        })
    })
}

/// An object holding every listed property. A [`Property::Checked`] entry
/// also runs its validator on the property's value.
pub fn has_properties<I, P>(properties: I) -> Rule
where
    I: IntoIterator<Item = P>,
    P: Into<Property>,
{
    let checks: Vec<(String, Option<Rule>)> = properties
        .into_iter()
        .map(|p| match p.into() {
            Property::Name(name) => (name, None),
            Property::Checked { name, validator } => (name, Some(validator.function())),
        })
        .collect();

    let items = checks.iter()
        .map(|(name, rule)| match rule {
            None => quoted(name),
            Some(rule) => format!("{}: {}", quoted(name), rule.description()),
        })
        .collect::<Vec<_>>()
        .join(",");

    Rule::new(format!("have properties: [{items}]"), move |v| {
        let Some(object) = v.as_object() else { return false };
        checks.iter().all(|(name, rule)| match (object.get(name), rule) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(value), Some(rule)) => rule.check(value),
        })
    })
}

/// Present and not `null`.
pub fn is_set() -> Rule {
    Rule::new("is set", |v| !v.is_null())
}

// ── Combinators ───────────────────────────────────────────────────────────────

/// Every rule must pass.
pub fn and(rules: Vec<Rule>) -> Rule {
    let description = joined("AND : ", &rules);
    Rule::new(description, move |v| rules.iter().all(|r| r.check(v)))
}

/// At least one rule must pass.
pub fn or(rules: Vec<Rule>) -> Rule {
    let description = joined("OR : ", &rules);
    Rule::new(description, move |v| rules.iter().any(|r| r.check(v)))
}

pub fn not(rule: Rule) -> Rule {
    Rule::new(format!("NOT : \n {}", rule.description()), move |v| !rule.check(v))
}

fn joined(header: &str, rules: &[Rule]) -> String {
    let mut description = header.to_owned();
    for rule in rules {
        description.push_str("\n- ");
        description.push_str(rule.description());
        description.push(' ');
    }
    description
}

// ── Property ──────────────────────────────────────────────────────────────────

/// One entry of [`has_properties`].
#[derive(Clone, Debug)]
pub enum Property {
    /// The property must exist.
    Name(String),
    /// The property must exist and its value must pass `validator`.
    Checked { name: String, validator: Validator },
}

impl Property {
    pub fn checked(name: impl Into<String>, validator: Validator) -> Self {
        Self::Checked { name: name.into(), validator }
    }
}

impl From<&str> for Property {
    fn from(name: &str) -> Self { Self::Name(name.to_owned()) }
}

impl From<String> for Property {
    fn from(name: String) -> Self { Self::Name(name) }
}

impl From<(&str, Validator)> for Property {
    fn from((name, validator): (&str, Validator)) -> Self { Self::checked(name, validator) }
}

// ── Validator ─────────────────────────────────────────────────────────────────

/// A named chain of rules, implicitly AND-ed.
///
/// [`Validator::not`] flips a pending flag: the next rule added is wrapped in
/// [`not`] before it is appended.
#[derive(Clone, Debug)]
pub struct Validator {
    name: String,
    rules: Vec<Rule>,
    negate_next: bool,
}

impl Validator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), rules: Vec::new(), negate_next: false }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Negates the next rule added.
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.negate_next = !self.negate_next;
        self
    }

    /// Appends any rule, including composed ones.
    pub fn rule(mut self, rule: Rule) -> Self {
        let rule = if self.negate_next { not(rule) } else { rule };
        self.negate_next = false;
        self.rules.push(rule);
        self
    }

    pub fn equal(self, expected: impl Into<Value>) -> Self { self.rule(equal(expected)) }
    pub fn greater_than(self, bound: f64) -> Self { self.rule(greater_than(bound)) }
    pub fn greater_or_equal(self, bound: f64) -> Self { self.rule(greater_or_equal(bound)) }
    pub fn less_than(self, bound: f64) -> Self { self.rule(less_than(bound)) }
    pub fn less_or_equal(self, bound: f64) -> Self { self.rule(less_or_equal(bound)) }
    pub fn between(self, min: f64, max: f64) -> Self { self.rule(between(min, max)) }
    pub fn is_of_type(self, type_name: &str) -> Self { self.rule(is_of_type(type_name)) }
    pub fn is_number(self) -> Self { self.rule(is_number()) }
    pub fn is_object(self) -> Self { self.rule(is_object()) }
    pub fn is_string(self, min: usize, max: usize) -> Self { self.rule(is_string(min, max)) }
    pub fn matches_pattern(self, pattern: &str) -> Self { self.rule(matches_pattern(pattern)) }
    pub fn is_array(self, min_len: i64) -> Self { self.rule(is_array(min_len)) }
    pub fn is_set(self) -> Self { self.rule(is_set()) }

    pub fn has_properties<I, P>(self, properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Property>,
    {
        self.rule(has_properties(properties))
    }

    /// Collapses the chain: no rule accepts everything, one rule is itself,
    /// several are their [`and`].
    pub fn function(&self) -> Rule {
        match self.rules.as_slice() {
            [] => Rule::always(),
            [single] => single.clone(),
            rules => and(rules.to_vec()),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), HttpError> {
        validate(value, self)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Something [`validate`] accepts: a bare [`Rule`] or a [`Validator`].
pub trait Validation {
    /// The rule to evaluate.
    fn to_rule(&self) -> Rule;

    /// The name shown in the error message for `value`.
    fn label(&self, value: &Value) -> String;
}

impl Validation for Rule {
    fn to_rule(&self) -> Rule { self.clone() }

    /// Bare rules have no name; the offending value is shown as JSON.
    fn label(&self, value: &Value) -> String { value.to_string() }
}

impl Validation for Validator {
    fn to_rule(&self) -> Rule { self.function() }
    fn label(&self, _value: &Value) -> String { self.name.clone() }
}

/// Evaluates `validation` against `value`.
///
/// On failure returns a 400 whose message is
/// `Validation error: <label>  <description>`.
pub fn validate<V: Validation + ?Sized>(value: &Value, validation: &V) -> Result<(), HttpError> {
    let rule = validation.to_rule();
    if rule.check(value) {
        return Ok(());
    }
    Err(HttpError::bad_request(format!(
        "Validation error: {}  {}",
        validation.label(value),
        rule.description()
    )))
}

// ── Value helpers ─────────────────────────────────────────────────────────────

fn type_tag(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "object",
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn quoted(name: &str) -> String {
    Value::String(name.to_owned()).to_string()
}
