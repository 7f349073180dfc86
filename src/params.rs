// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Tuning constants and parameter clamping.

use crate::arith::Num;
use crate::Uint;

/// Sieve segment, in residue indices (about the L2 budget per core).
pub const SEGMENT_SPAN: u64 = 1 << 23;

/// The largest prime with a precomputed residue table.
pub const MAX_WHEEL_LEVEL: u64 = 11;

/// Gear radii must stay inside a machine word for bit indexing;
/// the primorial of 47 is the last one that does.
pub const MAX_GEAR_LEVEL: u64 = 47;

/// Wheel levels are supported from 1 (no wheel) to 11 (radius 2310).
pub fn clamp_wheel_level(level: u64) -> u64 {
    level.clamp(1, MAX_WHEEL_LEVEL)
}

/// The gear stack contains at least the wheel primes.
pub fn clamp_gear_level(level: u64, wheel_level: u64) -> u64 {
    level.clamp(wheel_level, MAX_GEAR_LEVEL)
}

/// Factor base size: multiplier * log2(N), rounded up.
pub fn factor_base_size(n: &Uint, multiplier: f64) -> usize {
    let log2 = n.bits().saturating_sub(1) as f64;
    (multiplier * log2).ceil() as usize
}

/// Flush threshold for the per-worker semi-smooth buffers.
pub fn smooth_parts_limit(wheel_entry_count: u64, batch_size_multiplier: f64) -> usize {
    let limit = 2.0 * wheel_entry_count as f64 * batch_size_multiplier;
    // Keep the buffer meaningful even for tiny wheels or multipliers.
    (limit.ceil() as usize).max(16)
}

#[test]
fn test_clamps() {
    assert_eq!(clamp_wheel_level(0), 1);
    assert_eq!(clamp_wheel_level(7), 7);
    assert_eq!(clamp_wheel_level(99), 11);
    assert_eq!(clamp_gear_level(5, 7), 7);
    assert_eq!(clamp_gear_level(13, 7), 13);
    assert_eq!(clamp_gear_level(1000, 7), 47);
}

#[test]
fn test_factor_base_size() {
    let n = Uint::from(1u64) << 256;
    assert_eq!(factor_base_size(&n, 1.0), 256);
    assert_eq!(factor_base_size(&n, 1.5), 384);
}
