use crate::error::ConfigurationError;

/// Tolerance used by [`round_pow2`], measured in log2 units.
///
/// A value whose log2 lies within this distance above an integer rounds
/// down to that power instead of jumping to the next one.
pub const DEFAULT_ROUND_THRESHOLD: f64 = 1e-2;

/// Round `value` up to a power of two, tolerating float error.
pub fn round_pow2(value: f64) -> Result<u64, ConfigurationError> {
    round_pow2_with(value, DEFAULT_ROUND_THRESHOLD)
}

/// Round `value` up to a power of two using an explicit `threshold`.
///
/// Values below `threshold` give 0. Values in `[threshold, 1]` give 1.
pub fn round_pow2_with(value: f64, threshold: f64) -> Result<u64, ConfigurationError> {
    if value.is_nan() || value < 0.0 {
        return Err(ConfigurationError::InvalidValue(value));
    }
    if value < threshold {
        return Ok(0);
    }
    if value.is_infinite() {
        return Err(ConfigurationError::ValueOutOfRange(value));
    }

    let log2 = value.log2();
    let base = log2.floor();
    let exp = if log2 - base > threshold { base + 1.0 } else { base };
    let exp = exp.max(0.0);
    if exp > 62.0 {
        return Err(ConfigurationError::ValueOutOfRange(value));
    }
    Ok(1u64 << exp as u32)
}
