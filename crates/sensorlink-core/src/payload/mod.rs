//! Telemetry payload decoding.
//!
//! The decoder follows a layered structure:
//! - `layout`: field offsets, widths and scales (source of truth)
//! - `reader`: exact-length check and big-endian byte access
//! - `convert`: two's-complement reconstruction and fixed-point scaling
//! - `timestamp`: epoch seconds to ISO-8601 UTC
//! - `parser`: field-by-field decoding driven by a layout
//! - `error`: explicit, actionable errors
//!
//! One routine serves every payload variant; variants differ only by their
//! `Layout`. Decoding is pure: no I/O, no shared state, the input buffer is
//! only borrowed.

mod convert;
pub mod error;
pub mod layout;
pub mod parser;
mod reader;
mod timestamp;

pub use error::{DecodeError, LayoutError};
pub use layout::{FieldSpec, Layout, LayoutId, Transform, Width};
pub use parser::{decode, decode_uplink};
