//! ParkingSlot domain entity
//!
//! A parking slot is one item of the SharePoint "ParkingSlots" list. The
//! struct keeps the list's column names on the wire (`ID`, `Title`,
//! `TipoCelda`, `Itinerancia`, `Activa`) so records serialize exactly as
//! the list exposes them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// A record of the parking slots list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParkingSlot {
    /// Server-assigned list item ID, immutable after creation
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    /// Cell type column
    #[serde(rename = "TipoCelda", default)]
    pub tipo_celda: Option<String>,
    /// Roaming column; free-form value as stored by SharePoint
    #[serde(rename = "Itinerancia", default)]
    pub itinerancia: Option<Value>,
    #[serde(rename = "Activa", default, deserialize_with = "deserialize_bool_like")]
    pub activa: Option<bool>,
}

impl ParkingSlot {
    /// Maps a raw Graph `listItem` payload into a flat record.
    ///
    /// The item ID is read from `item.id` (numbers are stringified, a
    /// missing ID becomes the empty string); columns are read from
    /// `item.fields`, and anything absent maps to `None`. Numeric or boolean
    /// text columns are stringified; values that still cannot be mapped are
    /// logged at debug level and dropped.
    pub fn from_graph_item(item: &Value) -> Self {
        let id = match item.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let fields = item.get("fields").unwrap_or(&Value::Null);

        let activa = fields.get("Activa").filter(|v| !v.is_null()).and_then(|raw| {
            let activa = bool_like(raw);
            if activa.is_none() {
                debug!(id = %id, value = %raw, "Unrecognised Activa value, leaving it unset");
            }
            activa
        });

        Self {
            title: text_column(&id, fields, "Title"),
            tipo_celda: text_column(&id, fields, "TipoCelda"),
            itinerancia: fields.get("Itinerancia").filter(|v| !v.is_null()).cloned(),
            activa,
            id,
        }
    }
}

fn text_column(id: &str, fields: &Value, column: &str) -> Option<String> {
    match fields.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            debug!(id, column, value = %other, "Non-scalar text column, leaving it unset");
            None
        }
    }
}

/// Payload for creating a list item; the server assigns the ID
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewParkingSlot {
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "TipoCelda", skip_serializing_if = "Option::is_none")]
    pub tipo_celda: Option<String>,
    #[serde(rename = "Itinerancia", skip_serializing_if = "Option::is_none")]
    pub itinerancia: Option<Value>,
    #[serde(rename = "Activa", skip_serializing_if = "Option::is_none")]
    pub activa: Option<bool>,
}

impl NewParkingSlot {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_tipo_celda(mut self, tipo_celda: impl Into<String>) -> Self {
        self.tipo_celda = Some(tipo_celda.into());
        self
    }

    pub fn with_itinerancia(mut self, itinerancia: Value) -> Self {
        self.itinerancia = Some(itinerancia);
        self
    }

    pub fn with_activa(mut self, activa: bool) -> Self {
        self.activa = Some(activa);
        self
    }
}

/// Partial update; only the fields that are set are sent to the server
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParkingSlotPatch {
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "TipoCelda", skip_serializing_if = "Option::is_none")]
    pub tipo_celda: Option<String>,
    #[serde(rename = "Itinerancia", skip_serializing_if = "Option::is_none")]
    pub itinerancia: Option<Value>,
    #[serde(rename = "Activa", skip_serializing_if = "Option::is_none")]
    pub activa: Option<bool>,
}

impl ParkingSlotPatch {
    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.tipo_celda.is_none()
            && self.itinerancia.is_none()
            && self.activa.is_none()
    }
}

/// Interprets a SharePoint yes/no value.
///
/// Accepts JSON booleans, `0`/`1`, and the strings `true`, `false`, `yes`,
/// `no`, `si`, `sí`, `1`, `0` in any case. Anything else is `None`.
pub fn bool_like(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "si" | "sí" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn deserialize_bool_like<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(bool_like))
}
