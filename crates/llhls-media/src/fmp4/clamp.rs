//! Range-checked narrowing for box fields.
//!
//! Values that do not fit are clamped to the field's maximum and reported,
//! never wrapped.

use std::time::Duration;

use tracing::warn;

pub(crate) const U31_MAX: u32 = 0x7FFF_FFFF;

pub(crate) fn clamp_u16(value: u64, field: &'static str) -> u16 {
    u16::try_from(value).unwrap_or_else(|_| {
        warn!(field, value, "value exceeds u16 range, clamping");
        u16::MAX
    })
}

pub(crate) fn clamp_u32(value: u64, field: &'static str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        warn!(field, value, "value exceeds u32 range, clamping");
        u32::MAX
    })
}

pub(crate) fn clamp_i32(value: u64, field: &'static str) -> i32 {
    i32::try_from(value).unwrap_or_else(|_| {
        warn!(field, value, "value exceeds i32 range, clamping");
        i32::MAX
    })
}

/// 31-bit fields such as the sidx referenced size.
pub(crate) fn clamp_u31(value: u64, field: &'static str) -> u32 {
    if value > u64::from(U31_MAX) {
        warn!(field, value, "value exceeds 31-bit range, clamping");
        return U31_MAX;
    }
    value as u32
}

/// Convert a duration into ticks of `timescale`.
pub(crate) fn ticks(duration: Duration, timescale: u32) -> u64 {
    let ticks = duration.as_nanos() * u128::from(timescale) / 1_000_000_000;
    u64::try_from(ticks).unwrap_or_else(|_| {
        warn!(ticks = %ticks, "tick count exceeds u64 range, clamping");
        u64::MAX
    })
}
