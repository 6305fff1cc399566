use tracing::debug;

use super::convert::{scale, to_signed};
use super::error::DecodeError;
use super::layout::{FieldSpec, Layout, Transform};
use super::reader::PayloadReader;
use super::timestamp::render_iso8601;
use crate::output::{DecodedFields, FieldValue, UplinkOutput};

/// Decode a payload against a layout.
///
/// The length check runs first and is the only input validation; on
/// mismatch no field is read.
///
/// # Errors
/// Returns `DecodeError::LengthMismatch` when the payload length differs
/// from the layout's expected length, and `DecodeError::TimestampOutOfRange`
/// when an ISO-8601 field cannot be rendered.
pub fn decode(layout: &Layout, payload: &[u8]) -> Result<DecodedFields, DecodeError> {
    let reader = PayloadReader::new(payload);
    if let Err(err) = reader.require_exact_len(layout) {
        debug!(layout = layout.name(), actual = payload.len(), "payload rejected");
        return Err(err);
    }

    let mut fields = DecodedFields::with_capacity(layout.fields().len());
    for spec in layout.fields() {
        let raw = reader
            .read_be(spec.offset, spec.width)
            .ok_or_else(|| DecodeError::LengthMismatch {
                layout: layout.name().to_string(),
                expected: layout.expected_len(),
                actual: payload.len(),
            })?;
        fields.push(spec.name.as_str(), decode_field(spec, raw)?);
    }
    debug!(layout = layout.name(), fields = fields.len(), "payload decoded");
    Ok(fields)
}

/// Decode a payload into the `data`/`warnings` shape an uplink host expects.
///
/// Never fails: every `DecodeError` becomes a single warning.
///
/// # Examples
/// ```
/// use sensorlink_core::{Layout, LayoutId, decode_uplink};
///
/// let layout = Layout::builtin(LayoutId::A)?;
/// let output = decode_uplink(&layout, &[0u8; 7]);
/// assert_eq!(output.warnings().len(), 1);
/// assert!(output.data().is_none());
/// # Ok::<(), sensorlink_core::LayoutError>(())
/// ```
pub fn decode_uplink(layout: &Layout, payload: &[u8]) -> UplinkOutput {
    UplinkOutput::from(decode(layout, payload))
}

fn decode_field(spec: &FieldSpec, raw: u64) -> Result<FieldValue, DecodeError> {
    match spec.transform {
        Some(Transform::Iso8601) => render_iso8601(raw).map(FieldValue::Timestamp).ok_or_else(
            || DecodeError::TimestampOutOfRange {
                field: spec.name.clone(),
                seconds: raw,
            },
        ),
        Some(Transform::EpochSeconds) => Ok(FieldValue::Unsigned(raw)),
        None if spec.signed => {
            let value = to_signed(raw, spec.width);
            Ok(match spec.scale {
                Some(divisor) => FieldValue::Float(scale(value as f64, divisor)),
                None => FieldValue::Integer(value),
            })
        }
        None => Ok(match spec.scale {
            Some(divisor) => FieldValue::Float(scale(raw as f64, divisor)),
            None => FieldValue::Unsigned(raw),
        }),
    }
}
