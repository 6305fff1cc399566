use super::layout::Width;

/// Reinterpret the low `width` bits of `raw` as a two's-complement value.
///
/// When the top bit of the declared width is set, 2^width is subtracted.
/// The arithmetic runs in `i128` so the 64-bit case needs no special path.
pub(crate) fn to_signed(raw: u64, width: Width) -> i64 {
    let modulus = 1i128 << width.bits();
    let value = i128::from(raw) & (modulus - 1);
    let signed = if value & (modulus >> 1) != 0 {
        value - modulus
    } else {
        value
    };
    signed as i64
}

pub(crate) fn scale(value: f64, divisor: f64) -> f64 {
    value / divisor
}
