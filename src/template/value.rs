//! Runtime values seen by templates.
//!
//! Plain data (front matter, config, filter results) is held inline; site
//! entities are `Object`s that resolve keys on demand so every lookup can
//! record a dependency edge.

use super::{RenderContext, RenderError};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A value with a dynamic read interface.
///
/// `get` receives the render context so implementations can trace the
/// dependency before answering.
pub trait Object: Send + Sync + fmt::Debug {
    fn get(self: Arc<Self>, key: &str, ctx: &mut RenderContext<'_>) -> Result<Value, RenderError>;

    /// Snapshot for the `json` filter and the `log` tag. Does not trace.
    fn to_json(&self) -> Json;

    /// Text written when the object itself is output.
    fn to_text(&self) -> String {
        String::new()
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Arc<dyn Object>),
}

impl Value {
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Nil,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Nil),
            Json::String(s) => Self::Str(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::from_json_map(map),
        }
    }

    pub fn from_json_map(map: &serde_json::Map<String, Json>) -> Self {
        Self::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Self::from_json(v)))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::Nil => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Str(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Object(obj) => obj.to_json(),
        }
    }

    /// Liquid truthiness: nil, false, `""` and `[]` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil | Self::Bool(false) => false,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) => Some(*f as i64),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text written for `{{ value }}`.
    pub fn render(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.clone(),
            Self::List(items) => items.iter().map(Self::render).collect(),
            Self::Map(_) => self.to_json().to_string(),
            Self::Object(obj) => obj.to_text(),
        }
    }

    /// Resolve one key on this value.
    ///
    /// Lists answer `size`, `first`, `last` and numeric indices; strings
    /// answer `size`.
    pub fn get_key(&self, key: &str, ctx: &mut RenderContext<'_>) -> Result<Self, RenderError> {
        Ok(match self {
            Self::Map(map) => match map.get(key) {
                Some(v) => v.clone(),
                None if key == "size" => Self::Int(len_i64(map.len())),
                None => Self::Nil,
            },
            Self::List(items) => match key {
                "size" => Self::Int(len_i64(items.len())),
                "first" => items.first().cloned().unwrap_or_default(),
                "last" => items.last().cloned().unwrap_or_default(),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
            },
            Self::Str(s) if key == "size" => Self::Int(len_i64(s.chars().count())),
            Self::Object(obj) => Arc::clone(obj).get(key, ctx)?,
            _ => Self::Nil,
        })
    }

    /// Resolve a dotted path relative to this value.
    pub fn get_path(&self, path: &str, ctx: &mut RenderContext<'_>) -> Result<Self, RenderError> {
        let mut value = self.clone();
        for key in path.split('.').filter(|k| !k.is_empty()) {
            value = value.get_key(key, ctx)?;
            if value.is_nil() {
                break;
            }
        }
        Ok(value)
    }

    /// Loose equality used by `==`, `!=` and the `where` filter.
    ///
    /// Numbers compare numerically; a number and a numeric string compare
    /// by text; objects compare by identity.
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            #[allow(clippy::cast_precision_loss)]
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Str(s), Self::Int(_) | Self::Float(_))
            | (Self::Int(_) | Self::Float(_), Self::Str(s)) => {
                let n = if let Self::Str(_) = self { other } else { self };
                *s == n.render()
            }
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            (Self::Object(a), Self::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

fn len_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl<T: Object + 'static> From<Arc<T>> for Value {
    fn from(obj: Arc<T>) -> Self {
        Self::Object(obj)
    }
}
