//! Field and layout definitions.
//!
//! Byte positions of the built-in layouts live here as constants; nothing
//! else in the crate hard-codes an offset.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LayoutError;

pub const BATTERY: &str = "Battery";
pub const TEMPERATURE: &str = "Temperature";
pub const HUMIDITY: &str = "Humidity";
pub const VELOCITY: &str = "Velocity";
pub const TIMESTAMP: &str = "Timestamp";

/// Offsets inside the four-reading sensor block, relative to its start.
pub const BATTERY_OFFSET: usize = 0;
pub const TEMPERATURE_OFFSET: usize = 2;
pub const HUMIDITY_OFFSET: usize = 4;
pub const VELOCITY_OFFSET: usize = 6;
pub const SENSOR_BLOCK_LEN: usize = 8;

pub const TIMESTAMP_OFFSET: usize = 0;
pub const EPOCH32_LEN: usize = 4;
pub const EPOCH64_LEN: usize = 8;

/// Two implied decimal digits (hundredths).
pub const CENTI_SCALE: f64 = 100.0;

/// Width of a big-endian integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Width {
    Bits16,
    Bits32,
    Bits64,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::Bits16 => 2,
            Width::Bits32 => 4,
            Width::Bits64 => 8,
        }
    }

    pub const fn bits(self) -> u32 {
        (self.bytes() as u32) * 8
    }
}

impl TryFrom<u8> for Width {
    type Error = LayoutError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(Width::Bits16),
            32 => Ok(Width::Bits32),
            64 => Ok(Width::Bits64),
            _ => Err(LayoutError::InvalidWidth { bits }),
        }
    }
}

impl From<Width> for u8 {
    fn from(width: Width) -> Self {
        width.bits() as u8
    }
}

/// Output transform applied to a timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Seconds since the Unix epoch, kept as an integer.
    EpochSeconds,
    /// Seconds since the Unix epoch, rendered as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    Iso8601,
}

/// One named field inside a payload.
///
/// # Examples
/// ```
/// use sensorlink_core::{FieldSpec, Width};
///
/// let field = FieldSpec::signed("Temperature", 2, Width::Bits16).with_scale(100.0);
/// assert_eq!(field.range(), 2..4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    pub offset: usize,
    pub width: Width,
    #[serde(default)]
    pub signed: bool,
    /// Divisor applied after sign reconstruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl FieldSpec {
    pub fn signed(name: impl Into<String>, offset: usize, width: Width) -> Self {
        Self {
            name: name.into(),
            offset,
            width,
            signed: true,
            scale: None,
            transform: None,
        }
    }

    pub fn unsigned(name: impl Into<String>, offset: usize, width: Width) -> Self {
        Self {
            signed: false,
            ..Self::signed(name, offset, width)
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset.saturating_add(self.width.bytes())
    }

    fn validate(&self, expected_len: usize) -> Result<(), LayoutError> {
        let end = self.range().end;
        if end > expected_len {
            return Err(LayoutError::FieldOutOfBounds {
                field: self.name.clone(),
                end,
                expected_len,
            });
        }
        if let Some(scale) = self.scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(LayoutError::InvalidScale {
                    field: self.name.clone(),
                });
            }
        }
        if self.transform.is_some()
            && (self.signed || self.scale.is_some() || self.width == Width::Bits16)
        {
            return Err(LayoutError::InvalidTimestamp {
                field: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// A validated, immutable payload layout.
///
/// The only ways to obtain one are [`Layout::new`], [`Layout::builtin`] and
/// deserialization, all of which run the same validation. A layout therefore
/// never addresses bytes past `expected_len` and its fields never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutDef")]
pub struct Layout {
    name: String,
    expected_len: usize,
    fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutDef {
    name: String,
    expected_len: usize,
    fields: Vec<FieldSpec>,
}

impl TryFrom<LayoutDef> for Layout {
    type Error = LayoutError;

    fn try_from(def: LayoutDef) -> Result<Self, Self::Error> {
        Layout::new(def.name, def.expected_len, def.fields)
    }
}

impl Layout {
    pub fn new(
        name: impl Into<String>,
        expected_len: usize,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        if expected_len == 0 {
            return Err(LayoutError::ZeroLength { layout: name });
        }
        if fields.is_empty() {
            return Err(LayoutError::Empty { layout: name });
        }

        let mut names = HashSet::new();
        for field in &fields {
            field.validate(expected_len)?;
            if !names.insert(field.name.as_str()) {
                return Err(LayoutError::DuplicateField {
                    field: field.name.clone(),
                });
            }
        }

        let mut by_offset: Vec<&FieldSpec> = fields.iter().collect();
        by_offset.sort_by_key(|field| field.offset);
        for pair in by_offset.windows(2) {
            if pair[0].range().end > pair[1].offset {
                return Err(LayoutError::Overlap {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            expected_len,
            fields,
        })
    }

    /// Build one of the built-in layouts.
    ///
    /// # Examples
    /// ```
    /// use sensorlink_core::{Layout, LayoutId};
    ///
    /// let layout = Layout::builtin(LayoutId::D)?;
    /// assert_eq!(layout.expected_len(), 16);
    /// # Ok::<(), sensorlink_core::LayoutError>(())
    /// ```
    pub fn builtin(id: LayoutId) -> Result<Self, LayoutError> {
        let fields = match id {
            LayoutId::A | LayoutId::B => sensor_block(0, true),
            LayoutId::C => {
                let mut fields = vec![
                    FieldSpec::unsigned(TIMESTAMP, TIMESTAMP_OFFSET, Width::Bits32)
                        .with_transform(Transform::EpochSeconds),
                ];
                fields.extend(sensor_block(EPOCH32_LEN, true));
                fields
            }
            LayoutId::D => {
                let mut fields = vec![
                    FieldSpec::unsigned(TIMESTAMP, TIMESTAMP_OFFSET, Width::Bits64)
                        .with_transform(Transform::Iso8601),
                ];
                fields.extend(sensor_block(EPOCH64_LEN, false));
                fields
            }
        };
        Layout::new(id.name(), id.expected_len(), fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

fn sensor_block(base: usize, scaled: bool) -> Vec<FieldSpec> {
    let climate = |name: &str, offset: usize| {
        let field = FieldSpec::signed(name, base + offset, Width::Bits16);
        if scaled {
            field.with_scale(CENTI_SCALE)
        } else {
            field
        }
    };
    vec![
        FieldSpec::signed(BATTERY, base + BATTERY_OFFSET, Width::Bits16),
        climate(TEMPERATURE, TEMPERATURE_OFFSET),
        climate(HUMIDITY, HUMIDITY_OFFSET),
        FieldSpec::signed(VELOCITY, base + VELOCITY_OFFSET, Width::Bits16),
    ]
}

/// Identifier of a built-in layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutId {
    /// Sensor block with hundredths for temperature and humidity.
    A,
    /// Same fields as `A`, kept as its own name for older devices.
    B,
    /// 32-bit epoch seconds followed by the scaled sensor block.
    ///
    /// 12 bytes: timestamp at 0..4, readings at 4..12. The 8-byte framing
    /// seen in older decoders put the timestamp over the Battery bytes,
    /// which `Layout::new` rejects as an overlap.
    C,
    /// 64-bit epoch seconds (rendered ISO-8601) followed by raw readings.
    D,
}

impl LayoutId {
    pub const ALL: [LayoutId; 4] = [LayoutId::A, LayoutId::B, LayoutId::C, LayoutId::D];

    pub const fn name(self) -> &'static str {
        match self {
            LayoutId::A => "a",
            LayoutId::B => "b",
            LayoutId::C => "c",
            LayoutId::D => "d",
        }
    }

    pub const fn expected_len(self) -> usize {
        match self {
            LayoutId::A | LayoutId::B => SENSOR_BLOCK_LEN,
            LayoutId::C => EPOCH32_LEN + SENSOR_BLOCK_LEN,
            LayoutId::D => EPOCH64_LEN + SENSOR_BLOCK_LEN,
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutId {
    type Err = LayoutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(LayoutId::A),
            "b" => Ok(LayoutId::B),
            "c" => Ok(LayoutId::C),
            "d" => Ok(LayoutId::D),
            _ => Err(LayoutError::UnknownId {
                value: value.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layouts_validate() {
        for id in LayoutId::ALL {
            let layout = Layout::builtin(id).unwrap();
            assert_eq!(layout.name(), id.name());
            assert_eq!(layout.expected_len(), id.expected_len());
            let covered: usize = layout.fields().iter().map(|f| f.width.bytes()).sum();
            assert_eq!(covered, layout.expected_len());
        }
    }

    #[test]
    fn layout_c_timestamp_precedes_sensor_block() {
        let layout = Layout::builtin(LayoutId::C).unwrap();
        assert_eq!(layout.field(TIMESTAMP).unwrap().range(), 0..4);
        assert_eq!(layout.field(BATTERY).unwrap().range(), 4..6);
        assert_eq!(layout.field(VELOCITY).unwrap().range(), 10..12);
    }

    #[test]
    fn layout_d_readings_are_unscaled() {
        let layout = Layout::builtin(LayoutId::D).unwrap();
        assert!(layout.fields().iter().all(|f| f.scale.is_none()));
        assert_eq!(
            layout.field(TIMESTAMP).unwrap().transform,
            Some(Transform::Iso8601)
        );
    }

    #[test]
    fn rejects_field_past_expected_length() {
        let err = Layout::new(
            "short",
            3,
            vec![FieldSpec::signed(BATTERY, 2, Width::Bits16)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            LayoutError::FieldOutOfBounds {
                field: BATTERY.to_string(),
                end: 4,
                expected_len: 3,
            }
        );
    }

    #[test]
    fn rejects_overlapping_fields() {
        let err = Layout::new(
            "overlap",
            8,
            vec![
                FieldSpec::unsigned(TIMESTAMP, 0, Width::Bits32),
                FieldSpec::signed(BATTERY, 0, Width::Bits16),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::Overlap { .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Layout::new(
            "dup",
            4,
            vec![
                FieldSpec::signed(BATTERY, 0, Width::Bits16),
                FieldSpec::signed(BATTERY, 2, Width::Bits16),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateField { .. }));
    }

    fn scale_error(scale: f64) -> Result<Layout, LayoutError> {
        Layout::new(
            "scale",
            2,
            vec![FieldSpec::signed(TEMPERATURE, 0, Width::Bits16).with_scale(scale)],
        )
    }

    #[test]
    fn rejects_invalid_scales() {
        for scale in [0.0, -100.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(scale_error(scale), Err(LayoutError::InvalidScale { .. })),
                "scale {scale} accepted"
            );
        }
        assert!(scale_error(100.0).is_ok());
    }

    fn timestamp_error(field: FieldSpec) -> Result<Layout, LayoutError> {
        Layout::new("ts", 8, vec![field.with_transform(Transform::Iso8601)])
    }

    #[test]
    fn rejects_invalid_timestamp_fields() {
        let signed = FieldSpec::signed(TIMESTAMP, 0, Width::Bits32);
        let scaled = FieldSpec::unsigned(TIMESTAMP, 0, Width::Bits32).with_scale(1000.0);
        let narrow = FieldSpec::unsigned(TIMESTAMP, 0, Width::Bits16);
        for field in [signed, scaled, narrow] {
            assert!(matches!(
                timestamp_error(field),
                Err(LayoutError::InvalidTimestamp { .. })
            ));
        }
        assert!(timestamp_error(FieldSpec::unsigned(TIMESTAMP, 0, Width::Bits64)).is_ok());
    }

    #[test]
    fn rejects_empty_and_zero_length() {
        assert!(matches!(
            Layout::new("empty", 2, vec![]),
            Err(LayoutError::Empty { .. })
        ));
        assert!(matches!(
            Layout::new("zero", 0, vec![FieldSpec::signed(BATTERY, 0, Width::Bits16)]),
            Err(LayoutError::ZeroLength { .. })
        ));
    }

    #[test]
    fn deserialize_validates() {
        let json = r#"{
            "name": "bad",
            "expected_len": 2,
            "fields": [{"name": "Battery", "offset": 1, "width": 16, "signed": true}]
        }"#;
        let err = serde_json::from_str::<Layout>(json).unwrap_err();
        assert!(err.to_string().contains("past the expected length"));
    }

    #[test]
    fn deserialize_rejects_odd_width() {
        let json = r#"{"name": "Battery", "offset": 0, "width": 24}"#;
        let err = serde_json::from_str::<FieldSpec>(json).unwrap_err();
        assert!(err.to_string().contains("invalid field width"));
    }

    #[test]
    fn deserialize_rejects_unknown_keys() {
        let json = r#"{"name": "Battery", "offset": 0, "width": 16, "sigend": true}"#;
        let err = serde_json::from_str::<FieldSpec>(json).unwrap_err();
        assert!(err.to_string().contains("unknown field"));

        let json = r#"{
            "name": "x",
            "expected_len": 2,
            "fields": [{"name": "Battery", "offset": 0, "width": 16}],
            "extra": 1
        }"#;
        let err = serde_json::from_str::<Layout>(json).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn layout_id_parses_case_insensitively() {
        assert_eq!("D".parse::<LayoutId>().unwrap(), LayoutId::D);
        assert_eq!(" b ".parse::<LayoutId>().unwrap(), LayoutId::B);
        assert!("e".parse::<LayoutId>().is_err());
    }
}
