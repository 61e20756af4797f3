// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit-packing for the chunked codec's per-point `packed_*` words and the
//! SH-rest byte quantization (§4.5, §6, §9).
//!
//! The quaternion "largest-three" scheme is grounded in the donor's
//! `math.rs` quaternion pack/unpack functions in spirit (pick the dominant
//! component, encode the rest), but this format's bit layout
//! (`k<<30 | a<<20 | b<<10 | c`, plain unsigned components) differs from the
//! donor's sign+magnitude smallest-three layout, so the arithmetic is
//! rewritten rather than reused.

use std::f32::consts::FRAC_1_SQRT_2;

/// Rounds `v` (expected in `[lo, hi]`) to an unsigned integer with `bits`
/// bits of precision.
#[inline]
pub fn quantize_unsigned(v: f32, lo: f32, hi: f32, bits: u32) -> u32 {
	let max = (1u32 << bits) - 1;
	let t = ((v - lo) / (hi - lo) * max as f32).round().clamp(0.0, max as f32);

	t as u32
}

#[inline]
pub fn dequantize_unsigned(q: u32, lo: f32, hi: f32, bits: u32) -> f32 {
	let max = (1u32 << bits) - 1;

	lo + (q as f32 / max as f32) * (hi - lo)
}

/// Truncation-based 8-bit quantization for SH-rest coefficients: `clip(trunc((x
/// - lo) / (hi - lo) * 256), 0, 255)`. Truncation (not rounding) matches the
/// reference encoder exactly and is load-bearing for interop.
#[inline]
pub fn quantize_sh_byte(v: f32, lo: f32, hi: f32) -> u8 {
	let t = ((v - lo) / (hi - lo) * 256.0).trunc().clamp(0.0, 255.0);

	t as u8
}

#[inline]
pub fn dequantize_sh_byte(q: u8, lo: f32, hi: f32) -> f32 {
	lo + (q as f32 / 256.0) * (hi - lo)
}

/// Packs an 11-10-11 bit triple (position or scale) into one `u32`.
#[inline]
pub fn pack_11_10_11(qx: u32, qy: u32, qz: u32) -> u32 {
	(qx << 21) | (qy << 11) | qz
}

#[inline]
pub fn unpack_11_10_11(word: u32) -> (u32, u32, u32) {
	(word >> 21, (word >> 11) & 0x3FF, word & 0x7FF)
}

/// Packs four 8-bit color+opacity channels into one `u32`.
#[inline]
pub fn pack_color(qr: u8, qg: u8, qb: u8, qa: u8) -> u32 {
	((qr as u32) << 24) | ((qg as u32) << 16) | ((qb as u32) << 8) | (qa as u32)
}

#[inline]
pub fn unpack_color(word: u32) -> (u8, u8, u8, u8) {
	(
		(word >> 24) as u8,
		(word >> 16) as u8,
		(word >> 8) as u8,
		word as u8,
	)
}

fn other_indices(k: usize) -> [usize; 3] {
	let mut idx = [0usize; 3];
	let mut j = 0;

	for i in 0..4 {
		if i != k {
			idx[j] = i;
			j += 1;
		}
	}
	idx
}

/// Largest-three quaternion packing: `w,x,y,z` (container order) in, one
/// `u32` out as `(k<<30) | (a<<20) | (b<<10) | c`, where `k` is the index of
/// the largest-magnitude component (ties broken toward the lowest index) and
/// `a,b,c` are the remaining three components in ascending index order,
/// quantized from `[-1/sqrt(2), 1/sqrt(2)]` to 10 bits, after flipping the
/// quaternion's sign so the dropped component is non-negative.
pub fn pack_rotation_largest_three(q: [f32; 4]) -> u32 {
	let mut k = 0usize;
	let mut best = q[0].abs();

	for i in 1..4 {
		if q[i].abs() > best {
			best = q[i].abs();
			k = i;
		}
	}

	let sign = if q[k] < 0.0 { -1.0 } else { 1.0 };
	let q = [q[0] * sign, q[1] * sign, q[2] * sign, q[3] * sign];
	let idx = other_indices(k);

	let lo = -FRAC_1_SQRT_2;
	let hi = FRAC_1_SQRT_2;
	let a = quantize_unsigned(q[idx[0]], lo, hi, 10);
	let b = quantize_unsigned(q[idx[1]], lo, hi, 10);
	let c = quantize_unsigned(q[idx[2]], lo, hi, 10);

	((k as u32) << 30) | (a << 20) | (b << 10) | c
}

/// Inverse of [`pack_rotation_largest_three`]; returns `w,x,y,z`.
pub fn unpack_rotation_largest_three(word: u32) -> [f32; 4] {
	let k = (word >> 30) as usize;
	let a = (word >> 20) & 0x3FF;
	let b = (word >> 10) & 0x3FF;
	let c = word & 0x3FF;

	let lo = -FRAC_1_SQRT_2;
	let hi = FRAC_1_SQRT_2;
	let fa = dequantize_unsigned(a, lo, hi, 10);
	let fb = dequantize_unsigned(b, lo, hi, 10);
	let fc = dequantize_unsigned(c, lo, hi, 10);

	let sum_sq = fa * fa + fb * fb + fc * fc;
	let fk = (1.0 - sum_sq).max(0.0).sqrt();

	let idx = other_indices(k);
	let mut out = [0.0_f32; 4];

	out[k] = fk;
	out[idx[0]] = fa;
	out[idx[1]] = fb;
	out[idx[2]] = fc;
	out
}
