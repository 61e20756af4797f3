// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-chunk bounding boxes for position, scale, and SH0-as-RGB (§4.5).
//!
//! Each chunk's 18 bounds are computed once, up front, over the final
//! (sorted) point order; every quantized property within that chunk is then
//! linearly rescaled against its own axis bound.

use rayon::prelude::*;
use tracing::warn;

/// `{mean, scale, rgb}` min/max per chunk, 18 floats total, matching the wire
/// header's `min_x..max_r/g/b` property order exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkBounds {
	pub mean_min: [f32; 3],
	pub mean_max: [f32; 3],
	pub scale_min: [f32; 3],
	pub scale_max: [f32; 3],
	pub rgb_min: [f32; 3],
	pub rgb_max: [f32; 3],
}

impl ChunkBounds {
	/// Flattens into the 18-float wire order: means(min,max), scales(min,max),
	/// rgb(min,max).
	pub fn to_flat(self) -> [f32; 18] {
		let mut out = [0.0_f32; 18];

		out[0..3].copy_from_slice(&self.mean_min);
		out[3..6].copy_from_slice(&self.mean_max);
		out[6..9].copy_from_slice(&self.scale_min);
		out[9..12].copy_from_slice(&self.scale_max);
		out[12..15].copy_from_slice(&self.rgb_min);
		out[15..18].copy_from_slice(&self.rgb_max);
		out
	}

	pub fn from_flat(flat: &[f32]) -> Self {
		Self {
			mean_min: [flat[0], flat[1], flat[2]],
			mean_max: [flat[3], flat[4], flat[5]],
			scale_min: [flat[6], flat[7], flat[8]],
			scale_max: [flat[9], flat[10], flat[11]],
			rgb_min: [flat[12], flat[13], flat[14]],
			rgb_max: [flat[15], flat[16], flat[17]],
		}
	}
}

/// Nudges a degenerate (lo == hi) axis bound down so quantization never
/// divides by zero. Relative to the value's own magnitude so it stays
/// meaningful at any scale, and strictly positive even when `value == 0`.
pub fn nudge_degenerate(lo: f32, hi: f32) -> f32 {
	if lo < hi {
		lo
	} else {
		warn!(value = lo, "degenerate chunk bound (min == max); nudging min down to keep interval positive");
		lo - 1e-6 * lo.abs().max(1.0)
	}
}

fn axis_bounds(values: impl Iterator<Item = f32>) -> (f32, f32) {
	let mut lo = f32::INFINITY;
	let mut hi = f32::NEG_INFINITY;

	for v in values {
		lo = lo.min(v);
		hi = hi.max(v);
	}
	(nudge_degenerate(lo, hi), hi)
}

/// Computes one [`ChunkBounds`] per chunk of `chunk_size` consecutive points.
/// `means`/`scales` are row-major `(N,3)`; `rgb` is SH0 already converted to
/// `[0,1]`-ish RGB via `sh2rgb` (row-major `(N,3)`).
pub fn compute_chunk_bounds(means: &[f32], scales: &[f32], rgb: &[f32], chunk_size: usize) -> Vec<ChunkBounds> {
	let n = means.len() / 3;
	if n == 0 {
		return Vec::new();
	}
	let c = n.div_ceil(chunk_size);

	(0..c)
		.into_par_iter()
		.map(|ci| {
			let start = ci * chunk_size;
			let end = ((ci + 1) * chunk_size).min(n);

			let mut mean_min = [0.0; 3];
			let mut mean_max = [0.0; 3];
			let mut scale_min = [0.0; 3];
			let mut scale_max = [0.0; 3];
			let mut rgb_min = [0.0; 3];
			let mut rgb_max = [0.0; 3];

			for axis in 0..3 {
				let (lo, hi) = axis_bounds((start..end).map(|i| means[i * 3 + axis]));
				mean_min[axis] = lo;
				mean_max[axis] = hi;

				let (lo, hi) = axis_bounds((start..end).map(|i| scales[i * 3 + axis]));
				scale_min[axis] = lo;
				scale_max[axis] = hi;

				let (lo, hi) = axis_bounds((start..end).map(|i| rgb[i * 3 + axis]));
				rgb_min[axis] = lo;
				rgb_max[axis] = hi;
			}

			ChunkBounds {
				mean_min,
				mean_max,
				scale_min,
				scale_max,
				rgb_min,
				rgb_max,
			}
		})
		.collect()
}

/// Global min/max over every point's position, used for the Morton sort key
/// (a single coarse grid shared by the whole file, not per chunk).
pub fn compute_global_mean_bounds(means: &[f32]) -> ([f32; 3], [f32; 3]) {
	let n = means.len() / 3;
	if n == 0 {
		return ([0.0; 3], [1.0; 3]);
	}
	let mut lo = [0.0; 3];
	let mut hi = [0.0; 3];

	for axis in 0..3 {
		let (l, h) = axis_bounds((0..n).map(|i| means[i * 3 + axis]));
		lo[axis] = l;
		hi[axis] = h;
	}
	(lo, hi)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_nudge_degenerate_only_adjusts_equal_bounds() {
		assert_eq!(nudge_degenerate(1.0, 2.0), 1.0);
		assert!(nudge_degenerate(5.0, 5.0) < 5.0);
		assert!(nudge_degenerate(0.0, 0.0) < 0.0);
	}

	#[test]
	fn test_compute_chunk_bounds_single_chunk() {
		let means = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
		let scales = vec![0.1, 0.1, 0.1, 0.2, 0.2, 0.2];
		let rgb = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

		let bounds = compute_chunk_bounds(&means, &scales, &rgb, 256);

		assert_eq!(bounds.len(), 1);
		assert_eq!(bounds[0].mean_min, [0.0, 0.0, 0.0]);
		assert_eq!(bounds[0].mean_max, [1.0, 2.0, 3.0]);
	}

	#[test]
	fn test_compute_chunk_bounds_splits_at_chunk_size() {
		let n = 300;
		let means = vec![0.0_f32; n * 3];
		let scales = vec![0.0_f32; n * 3];
		let rgb = vec![0.0_f32; n * 3];

		let bounds = compute_chunk_bounds(&means, &scales, &rgb, 256);

		assert_eq!(bounds.len(), 2);
	}
}
