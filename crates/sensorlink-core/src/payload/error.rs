use thiserror::Error;

/// Errors returned when decoding a payload against a layout.
///
/// These describe malformed input, never a broken layout: a `Layout` cannot
/// be built unless every field fits inside its expected length.
///
/// # Examples
/// ```
/// use sensorlink_core::DecodeError;
///
/// let err = DecodeError::LengthMismatch {
///     layout: "a".to_string(),
///     expected: 8,
///     actual: 7,
/// };
/// assert!(err.to_string().contains("expected 8 bytes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload length is {actual} bytes, expected {expected} bytes for layout \"{layout}\"")]
    LengthMismatch {
        layout: String,
        expected: usize,
        actual: usize,
    },
    #[error("field \"{field}\" holds {seconds} epoch seconds, outside the representable calendar range")]
    TimestampOutOfRange { field: String, seconds: u64 },
    #[error("no layout accepts {actual}-byte payloads (known lengths: {known:?})")]
    NoLayoutForLength { actual: usize, known: Vec<usize> },
}

/// Errors raised while building a layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout \"{layout}\" has no fields")]
    Empty { layout: String },
    #[error("layout \"{layout}\" has an expected length of zero")]
    ZeroLength { layout: String },
    #[error("field \"{field}\" ends at byte {end}, past the expected length {expected_len}")]
    FieldOutOfBounds {
        field: String,
        end: usize,
        expected_len: usize,
    },
    #[error("fields \"{first}\" and \"{second}\" overlap")]
    Overlap { first: String, second: String },
    #[error("field \"{field}\" is declared twice")]
    DuplicateField { field: String },
    #[error("field \"{field}\" has an invalid scale (must be finite and positive)")]
    InvalidScale { field: String },
    #[error("field \"{field}\" cannot carry a timestamp (needs an unscaled unsigned 32 or 64-bit field)")]
    InvalidTimestamp { field: String },
    #[error("invalid field width: {bits} bits (expected 16, 32 or 64)")]
    InvalidWidth { bits: u8 },
    #[error("unknown layout id \"{value}\" (expected a, b, c or d)")]
    UnknownId { value: String },
}
