//! # Coordinate Offset Codec
//!
//! The contract stores positions as `uint256`; the client works in signed,
//! continuous world units. The transform is `floor(v) + OFFSET` on the way in
//! and `raw - OFFSET` on the way out, so `decode(encode(v)) == floor(v)` for
//! every `v >= -OFFSET`.

use crate::entities::U256;
use crate::errors::CoordinateError;

/// Additive offset applied before submission and removed after decoding.
pub const COORDINATE_OFFSET: i64 = 10_000;

/// Encode a client coordinate into its on-chain representation.
pub fn encode_coordinate(value: f64) -> Result<U256, CoordinateError> {
    if !value.is_finite() {
        return Err(CoordinateError::NotFinite(value));
    }
    let floored = value.floor();
    if floored < -(COORDINATE_OFFSET as f64) {
        return Err(CoordinateError::BelowMinimum {
            value,
            min: -COORDINATE_OFFSET,
        });
    }
    // Anything past 2^53 has already lost integer precision in f64.
    if floored > 9_007_199_254_740_992.0 {
        return Err(CoordinateError::OutOfRange(value.to_string()));
    }
    let shifted = floored as i64 + COORDINATE_OFFSET;
    Ok(U256::from(shifted as u64))
}

/// Decode an on-chain coordinate back into client units.
pub fn decode_coordinate(raw: U256) -> Result<i64, CoordinateError> {
    if raw > U256::from(i64::MAX as u64) {
        return Err(CoordinateError::OutOfRange(raw.to_string()));
    }
    Ok(raw.low_u64() as i64 - COORDINATE_OFFSET)
}

/// Encode a point, failing if either axis is out of domain.
pub fn encode_point(x: f64, y: f64) -> Result<(U256, U256), CoordinateError> {
    Ok((encode_coordinate(x)?, encode_coordinate(y)?))
}

/// Decode a point, failing if either axis is out of range.
pub fn decode_point(x: U256, y: U256) -> Result<(i64, i64), CoordinateError> {
    Ok((decode_coordinate(x)?, decode_coordinate(y)?))
}
