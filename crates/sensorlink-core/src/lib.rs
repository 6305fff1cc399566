//! sensorlink core library: decoding of fixed-layout sensor uplinks.
//!
//! A low-power sensor packs battery level, temperature, humidity, velocity
//! and optionally a timestamp into a short big-endian byte array. This crate
//! turns such a buffer back into named, typed values. Every payload variant
//! is described by a validated [`Layout`]; a single decoder handles all of
//! them (layout/reader/parser layering under `payload`).
//!
//! Decoding is pure and synchronous. The only file access lives in
//! [`config`], which loads extra layout definitions.
//!
//! Invariants:
//! - A `Layout` cannot exist unless all its fields fit inside its expected
//!   length without overlapping.
//! - The payload length is checked before any field is read.
//! - A decode yields either data or a non-empty list of warnings, never both.
//!
//! # Examples
//! ```
//! use sensorlink_core::{FieldValue, Layout, LayoutId, decode};
//!
//! let layout = Layout::builtin(LayoutId::A)?;
//! let fields = decode(&layout, &[0x00, 0x64, 0xFF, 0x9C, 0x03, 0x84, 0x00, 0x0A])?;
//! assert_eq!(fields.get("Temperature"), Some(&FieldValue::Float(-1.0)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod output;
mod payload;
mod registry;
mod report;

pub use config::{ConfigError, load_layouts, parse_layouts};
pub use output::{DecodedField, DecodedFields, FieldValue, UplinkOutput};
pub use payload::{
    DecodeError, FieldSpec, Layout, LayoutError, LayoutId, Transform, Width, decode,
    decode_uplink,
};
pub use registry::LayoutRegistry;
pub use report::{
    LayoutSelector, REPORT_VERSION, Report, ReportEntry, ReportError, ToolInfo, decode_batch,
};

/// Field names used by the built-in layouts.
pub mod field_names {
    pub use crate::payload::layout::{BATTERY, HUMIDITY, TEMPERATURE, TIMESTAMP, VELOCITY};
}
