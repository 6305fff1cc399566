use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::payload::DecodeError;

/// A decoded field value.
///
/// Serialized untagged, so JSON carries plain numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed integer after two's-complement reconstruction.
    Integer(i64),
    /// Unsigned integer (including raw epoch seconds).
    Unsigned(u64),
    /// Scaled reading.
    Float(f64),
    /// ISO-8601 UTC timestamp.
    Timestamp(String),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Unsigned(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Timestamp(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

/// Decoded fields in layout order.
///
/// Serializes as a JSON object whose keys follow the layout's declaration
/// order.
///
/// # Examples
/// ```
/// use sensorlink_core::{Layout, LayoutId, decode};
///
/// let layout = Layout::builtin(LayoutId::A)?;
/// let fields = decode(&layout, &[0x00, 0x64, 0xFF, 0x9C, 0x03, 0x84, 0x00, 0x0A])?;
/// assert_eq!(fields.get("Battery").and_then(|v| v.as_i64()), Some(100));
/// assert_eq!(
///     serde_json::to_string(&fields)?,
///     r#"{"Battery":100,"Temperature":-1.0,"Humidity":9.0,"Velocity":10}"#
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFields {
    fields: Vec<DecodedField>,
}

impl DecodedFields {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push(DecodedField {
            name: name.into(),
            value,
        });
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecodedField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a DecodedFields {
    type Item = &'a DecodedField;
    type IntoIter = std::slice::Iter<'a, DecodedField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for DecodedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DecodedFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = DecodedFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = DecodedFields::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    fields.push(name, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Result handed back to an uplink-processing host.
///
/// Exactly one side is populated: `{"data": {...}}` on success or
/// `{"warnings": [...]}` (never empty) on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UplinkOutput {
    Data(DecodedFields),
    Warnings(Vec<String>),
}

impl UplinkOutput {
    pub fn data(&self) -> Option<&DecodedFields> {
        match self {
            UplinkOutput::Data(fields) => Some(fields),
            UplinkOutput::Warnings(_) => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            UplinkOutput::Data(_) => &[],
            UplinkOutput::Warnings(warnings) => warnings,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, UplinkOutput::Data(_))
    }
}

impl From<Result<DecodedFields, DecodeError>> for UplinkOutput {
    fn from(result: Result<DecodedFields, DecodeError>) -> Self {
        match result {
            Ok(fields) => UplinkOutput::Data(fields),
            Err(err) => UplinkOutput::Warnings(vec![err.to_string()]),
        }
    }
}
