//! Typed extraction of raw Jira field values.
//!
//! Jira returns field values as untyped JSON. An extractor interprets one
//! value as the semantic type of its field and signals `None` when the value
//! has an unexpected shape.

use serde_json::Value;

/// Interprets raw field values as `T`.
pub struct FieldExtractor<T> {
    expected: &'static str,
    extract: fn(&Value) -> Option<T>,
}

impl<T> FieldExtractor<T> {
    /// Create an extractor from a description of the expected shape and a
    /// conversion function.
    #[must_use]
    pub const fn new(expected: &'static str, extract: fn(&Value) -> Option<T>) -> Self {
        Self { expected, extract }
    }

    /// Description of the expected value shape, used in error messages.
    #[must_use]
    pub fn expected(&self) -> &'static str {
        self.expected
    }

    /// Interpret a raw value, `None` if it has an unexpected shape.
    pub fn extract(&self, value: &Value) -> Option<T> {
        (self.extract)(value)
    }
}

impl<T> Clone for FieldExtractor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldExtractor<T> {}

impl<T> std::fmt::Debug for FieldExtractor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldExtractor")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

/// A plain string, as used by the summary.
#[must_use]
pub fn string() -> FieldExtractor<String> {
    FieldExtractor::new("a string", |value| value.as_str().map(str::to_string))
}

/// A string that Jira reports as `null` when empty, as used by the description.
#[must_use]
pub fn nullable_string() -> FieldExtractor<String> {
    FieldExtractor::new("a string or null", |value| match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    })
}

/// An array of strings, as used by the labels.
#[must_use]
pub fn string_array() -> FieldExtractor<Vec<String>> {
    FieldExtractor::new("an array of strings", |value| {
        value
            .as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    })
}

/// A select list option `{"value": "..."}`, as used by the Xray test type.
#[must_use]
pub fn option_value() -> FieldExtractor<String> {
    FieldExtractor::new("an object with a string property \"value\"", |value| {
        value.get("value")?.as_str().map(str::to_string)
    })
}
