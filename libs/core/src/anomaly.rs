use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Structured data attached to an [`Anomaly`]
pub type AnomalyData = BTreeMap<String, Primitive>;

/// A primitive value carried in [`AnomalyData`]
///
/// Human-readable formats carry the bare value (`"x"`, `1.5`, `true`).
/// Compact formats such as bincode cannot infer a type from the input, so
/// they carry the variant tag as well.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    String(String),
    Number(f64),
    Bool(bool),
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "Primitive")]
enum Tagged {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Serialize for Primitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return match self {
                Primitive::String(value) => serializer.serialize_str(value),
                Primitive::Number(value) => serializer.serialize_f64(*value),
                Primitive::Bool(value) => serializer.serialize_bool(*value),
            };
        }

        let tagged = match self.clone() {
            Primitive::String(value) => Tagged::String(value),
            Primitive::Number(value) => Tagged::Number(value),
            Primitive::Bool(value) => Tagged::Bool(value),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Primitive {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            return deserializer.deserialize_any(PrimitiveVisitor);
        }

        Ok(match Tagged::deserialize(deserializer)? {
            Tagged::String(value) => Primitive::String(value),
            Tagged::Number(value) => Primitive::Number(value),
            Tagged::Bool(value) => Primitive::Bool(value),
        })
    }
}

struct PrimitiveVisitor;

impl<'de> Visitor<'de> for PrimitiveVisitor {
    type Value = Primitive;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Primitive, E> {
        Ok(Primitive::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Primitive, E> {
        Ok(Primitive::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Primitive, E> {
        Ok(Primitive::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Primitive, E> {
        Ok(Primitive::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Primitive, E> {
        Ok(Primitive::String(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Primitive, E> {
        Ok(Primitive::String(value))
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(value) => f.write_str(value),
            Primitive::Number(value) => write!(f, "{value}"),
            Primitive::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Domain-level failure raised by a producer
///
/// Unlike an opaque internal error, an anomaly is something the consumer is
/// expected to handle, so it carries structured data alongside the message.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct Anomaly {
    pub message: String,
    #[serde(default)]
    pub data: AnomalyData,
}

impl Anomaly {
    /// Create an anomaly with no data
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: AnomalyData::new(),
        }
    }

    /// Create an anomaly with the given data
    pub fn with_data(message: impl Into<String>, data: AnomalyData) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    /// Attach a single data entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Primitive>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}
