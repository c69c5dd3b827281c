//! The tagged value model shared by scripts and providers.
//!
//! `TaggedValue` is the only currency that crosses the script/host boundary:
//! script values are converted into it on the way in, provider results are
//! converted out of it on the way back.

mod function;

pub use function::{CustomValue, NativeFn, ScriptFunction, ScriptHandle};

use std::collections::BTreeMap;
use std::fmt;

/// Field map of an `Object` value
pub type ObjectMap = BTreeMap<String, TaggedValue>;

/// Discriminant of a `TaggedValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Number,
    String,
    Array,
    Object,
    Error,
    Function,
    Custom,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Error => "error",
            ValueKind::Function => "function",
            ValueKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value crossing the script/host boundary
#[derive(Debug, Clone, Default)]
pub enum TaggedValue {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<TaggedValue>),
    Object(ObjectMap),
    /// Error description carried as data
    Error(String),
    Function(ScriptFunction),
    Custom(CustomValue),
}

impl TaggedValue {
    /// Build an `Object` from key/value pairs; later duplicates win
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TaggedValue)>,
    {
        TaggedValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            TaggedValue::Nil => ValueKind::Nil,
            TaggedValue::Bool(_) => ValueKind::Bool,
            TaggedValue::Number(_) => ValueKind::Number,
            TaggedValue::String(_) => ValueKind::String,
            TaggedValue::Array(_) => ValueKind::Array,
            TaggedValue::Object(_) => ValueKind::Object,
            TaggedValue::Error(_) => ValueKind::Error,
            TaggedValue::Function(_) => ValueKind::Function,
            TaggedValue::Custom(_) => ValueKind::Custom,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, TaggedValue::Nil)
    }

    /// Truthiness as providers see it: empty and zero values are false
    pub fn is_truthy(&self) -> bool {
        match self {
            TaggedValue::Nil | TaggedValue::Error(_) => false,
            TaggedValue::Bool(b) => *b,
            TaggedValue::Number(n) => *n != 0.0,
            TaggedValue::String(s) => !s.is_empty(),
            TaggedValue::Array(items) => !items.is_empty(),
            TaggedValue::Object(fields) => !fields.is_empty(),
            TaggedValue::Function(_) | TaggedValue::Custom(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TaggedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TaggedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TaggedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TaggedValue]> {
        match self {
            TaggedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            TaggedValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field lookup on an `Object`
    pub fn get(&self, key: &str) -> Option<&TaggedValue> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// Lossy conversion to JSON. Functions and custom values become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            TaggedValue::Nil | TaggedValue::Function(_) | TaggedValue::Custom(_) => Json::Null,
            TaggedValue::Bool(b) => Json::Bool(*b),
            TaggedValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            TaggedValue::String(s) | TaggedValue::Error(s) => Json::String(s.clone()),
            TaggedValue::Array(items) => Json::Array(items.iter().map(TaggedValue::to_json).collect()),
            TaggedValue::Object(fields) => Json::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => TaggedValue::Nil,
            Json::Bool(b) => TaggedValue::Bool(*b),
            Json::Number(n) => TaggedValue::Number(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => TaggedValue::String(s.clone()),
            Json::Array(items) => TaggedValue::Array(items.iter().map(TaggedValue::from_json).collect()),
            Json::Object(fields) => TaggedValue::Object(
                fields.iter().map(|(k, v)| (k.clone(), TaggedValue::from_json(v))).collect(),
            ),
        }
    }
}

impl PartialEq for TaggedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TaggedValue::Nil, TaggedValue::Nil) => true,
            (TaggedValue::Bool(a), TaggedValue::Bool(b)) => a == b,
            (TaggedValue::Number(a), TaggedValue::Number(b)) => a == b,
            (TaggedValue::String(a), TaggedValue::String(b)) => a == b,
            (TaggedValue::Array(a), TaggedValue::Array(b)) => a == b,
            (TaggedValue::Object(a), TaggedValue::Object(b)) => a == b,
            (TaggedValue::Error(a), TaggedValue::Error(b)) => a == b,
            (TaggedValue::Function(a), TaggedValue::Function(b)) => a.same_as(b),
            (TaggedValue::Custom(a), TaggedValue::Custom(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedValue::Nil => f.write_str("nil"),
            TaggedValue::Bool(b) => write!(f, "{}", b),
            TaggedValue::Number(n) => write!(f, "{}", n),
            TaggedValue::String(s) | TaggedValue::Error(s) => f.write_str(s),
            TaggedValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            TaggedValue::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            TaggedValue::Function(func) => write!(f, "function:{}", func.name()),
            TaggedValue::Custom(custom) => write!(f, "{}: custom", custom.type_name()),
        }
    }
}

impl From<bool> for TaggedValue {
    fn from(b: bool) -> Self {
        TaggedValue::Bool(b)
    }
}

impl From<f64> for TaggedValue {
    fn from(n: f64) -> Self {
        TaggedValue::Number(n)
    }
}

impl From<i64> for TaggedValue {
    fn from(n: i64) -> Self {
        TaggedValue::Number(n as f64)
    }
}

impl From<&str> for TaggedValue {
    fn from(s: &str) -> Self {
        TaggedValue::String(s.to_string())
    }
}

impl From<String> for TaggedValue {
    fn from(s: String) -> Self {
        TaggedValue::String(s)
    }
}

impl From<Vec<TaggedValue>> for TaggedValue {
    fn from(items: Vec<TaggedValue>) -> Self {
        TaggedValue::Array(items)
    }
}

impl From<ObjectMap> for TaggedValue {
    fn from(fields: ObjectMap) -> Self {
        TaggedValue::Object(fields)
    }
}

impl<T: Into<TaggedValue>> From<Option<T>> for TaggedValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(TaggedValue::Nil)
    }
}
