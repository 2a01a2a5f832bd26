use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Declared kind of an explorable variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Integer,
    Float,
    Boolean,
    /// Seconds since the Unix epoch.
    Date,
    Point,
    String,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::Integer => "int",
            VariableKind::Float => "float",
            VariableKind::Boolean => "bool",
            VariableKind::Date => "date",
            VariableKind::Point => "point",
            VariableKind::String => "string",
        };
        f.write_str(name)
    }
}

/// One concrete, typed parameter value.
///
/// Floats compare and hash by bit pattern so that candidate points can be used
/// as map keys. `-0.0` is normalised to `0.0` on construction through
/// [`Value::float`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(i64),
    Point([f64; 3]),
    Text(String),
}

impl Value {
    pub fn float(value: f64) -> Self {
        Value::Float(normalize_zero(value))
    }

    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Value::Point([normalize_zero(x), normalize_zero(y), normalize_zero(z)])
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Value::Int(_) => VariableKind::Integer,
            Value::Float(_) => VariableKind::Float,
            Value::Bool(_) => VariableKind::Boolean,
            Value::Date(_) => VariableKind::Date,
            Value::Point(_) => VariableKind::Point,
            Value::Text(_) => VariableKind::String,
        }
    }

    /// Scalar view used by numeric strategies and analyses.
    ///
    /// Points and text have no scalar view.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) | Value::Date(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Point(_) | Value::Text(_) => None,
        }
    }

    /// Parse a CSV cell written by [`Value`]'s `Display` implementation.
    pub fn parse_as(kind: VariableKind, raw: &str) -> Option<Value> {
        let text = raw;
        let raw = raw.trim();
        match kind {
            VariableKind::Integer => raw
                .parse::<i64>()
                .ok()
                .or_else(|| raw.parse::<f64>().ok().map(|v| v.round() as i64))
                .map(Value::Int),
            VariableKind::Float => raw.parse::<f64>().ok().map(Value::float),
            VariableKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            VariableKind::Date => raw.parse::<i64>().ok().map(Value::Date),
            VariableKind::Point => {
                let inner = raw.trim_start_matches('{').trim_end_matches('}');
                let parts: Vec<f64> = inner
                    .split(';')
                    .map(|part| part.trim().parse::<f64>())
                    .collect::<Result<_, _>>()
                    .ok()?;
                match parts.as_slice() {
                    [x, y] => Some(Value::point(*x, *y, 0.0)),
                    [x, y, z] => Some(Value::point(*x, *y, *z)),
                    _ => None,
                }
            }
            VariableKind::String => Some(Value::Text(text.to_string())),
        }
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Point(a), Value::Point(b)) => a
                .iter()
                .zip(b.iter())
                .all(|(x, y)| x.to_bits() == y.to_bits()),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int(v) | Value::Date(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Point(p) => p.iter().for_each(|c| c.to_bits().hash(state)),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) | Value::Date(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Point([x, y, z]) => write!(f, "{{{x};{y};{z}}}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
