//! Overlay record types, integer coercion and error definitions

use mongodb::bson::oid::ObjectId;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which the record identifier is exposed
pub const ID_KEY: &str = "_id";

/// Errors that can occur when working with overlays
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Invalid ID format")]
    InvalidId(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Invalid request body: {0}")]
    InvalidPayload(String),

    #[error("Overlay not found")]
    NotFound(String),

    /// Raw store error text, surfaced to the caller as-is
    #[error("{0}")]
    Storage(String),
}

/// Parse a caller-supplied identifier into a store object id
pub fn parse_overlay_id(id: &str) -> Result<ObjectId, OverlayError> {
    ObjectId::parse_str(id).map_err(|_| OverlayError::InvalidId(id.to_string()))
}

/// Coerce a JSON value to an integer the way the editor frontend expects.
///
/// Integers pass through, floats truncate toward zero, numeric strings are
/// parsed after trimming whitespace and booleans map to 0/1. Everything else
/// is rejected.
pub fn coerce_integer(field: &str, value: &Value) -> Result<i64, OverlayError> {
    let invalid = |reason: String| OverlayError::InvalidField {
        field: field.to_string(),
        reason,
    };

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                let truncated = f.trunc();
                if truncated.is_finite()
                    && truncated >= i64::MIN as f64
                    && truncated <= i64::MAX as f64
                {
                    Ok(truncated as i64)
                } else {
                    Err(invalid(format!("{} is out of integer range", n)))
                }
            } else {
                Err(invalid(format!("{} is out of integer range", n)))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("{:?} is not an integer", s))),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Null => Err(invalid("null is not an integer".to_string())),
        Value::Array(_) | Value::Object(_) => {
            Err(invalid("expected an integer, number or numeric string".to_string()))
        }
    }
}

/// Position and size of an overlay: the `x`, `y`, `width` and `height` keys,
/// always stored as integers. Each is optional since records are schemaless
/// beyond these four keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Geometry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl Geometry {
    /// Mutable slot for one of the reserved keys, `None` for any other key
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut Option<i64>> {
        match key {
            "x" => Some(&mut self.x),
            "y" => Some(&mut self.y),
            "width" => Some(&mut self.width),
            "height" => Some(&mut self.height),
            _ => None,
        }
    }

    /// Overwrite the fields that are set in `patch`, keep the rest
    pub fn merge(&mut self, patch: &Geometry) {
        for (key, value) in patch.fields() {
            if let Some(slot) = self.slot_mut(key) {
                *slot = Some(value);
            }
        }
    }

    /// Set fields as `(key, value)` pairs
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, i64)> {
        [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }
}

/// A set of fields supplied by a caller, already coerced.
///
/// Used for both create (all fields of the new record) and update (the
/// fields to merge into an existing record).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    pub geometry: Geometry,
    pub extra: Map<String, Value>,
}

impl OverlayPatch {
    /// Build a patch from a raw JSON object.
    ///
    /// Reserved keys are coerced to integers and any `_id` key is dropped:
    /// identifiers are assigned by the store and never change.
    pub fn from_json(fields: Map<String, Value>) -> Result<Self, OverlayError> {
        let mut patch = Self::default();

        for (key, value) in fields {
            if key == ID_KEY {
                continue;
            }
            match patch.geometry.slot_mut(&key) {
                Some(slot) => *slot = Some(coerce_integer(&key, &value)?),
                None => {
                    patch.extra.insert(key, value);
                }
            }
        }

        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty() && self.extra.is_empty()
    }
}

/// A stored overlay record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    #[serde(rename = "_id", serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Overlay {
    pub fn new(id: ObjectId, patch: OverlayPatch) -> Self {
        Self {
            id,
            geometry: patch.geometry,
            extra: patch.extra,
        }
    }

    /// Merge-patch: only the supplied fields change
    pub fn apply(&mut self, patch: &OverlayPatch) {
        self.geometry.merge(&patch.geometry);
        for (key, value) in &patch.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

fn serialize_object_id<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}
