// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SH↔RGB constants, sigmoid/logit, and the pre-activation / deactivation
//! kernels that move a container between linear (rendering) values and the
//! log/logit values the PLY wire formats store.
//!
//! Mirrors the shape of `math.rs` in the donor crate (free functions,
//! `#[inline]`, `rstest`-parameterized tests) but with the exact constants
//! and epsilon regimes this wire format's interoperability depends on.

use tracing::trace;

use crate::consts::SH_C0;

/// `x * SH_C0 + 0.5`
#[inline]
pub fn sh2rgb(x: f32) -> f32 {
	x * SH_C0 + 0.5
}

/// `(c - 0.5) / SH_C0`
#[inline]
pub fn rgb2sh(c: f32) -> f32 {
	(c - 0.5) / SH_C0
}

/// `log(y' / (1 - y'))` where `y' = clamp(y, eps, 1 - eps)`.
#[inline]
pub fn logit(y: f32, eps: f32) -> f32 {
	let y = y.clamp(eps, 1.0 - eps);
	(y / (1.0 - y)).ln()
}

/// Default eps for the standalone `logit` helper (not the deactivate kernel,
/// which uses its own eps=1e-4 per §4.1).
pub const LOGIT_DEFAULT_EPS: f32 = 1e-6;

#[inline]
pub fn sigmoid(x: f32) -> f32 {
	1.0 / (1.0 + (-x).exp())
}

/// Per-channel bands (K) to SH degree (D): `0,3,8,15 -> 0,1,2,3`. Returns
/// `None` for any other count, since K must be one of the four
/// schema-valid values. `3*K` is the total rest-scalar count per point.
#[inline]
pub fn degree_for_bands(k: usize) -> Option<u8> {
	match k {
		0 => Some(0),
		3 => Some(1),
		8 => Some(2),
		15 => Some(3),
		_ => None,
	}
}

/// SH degree (D) to per-channel bands (K): `0,1,2,3 -> 0,3,8,15`.
#[inline]
pub fn bands_for_degree(degree: u8) -> Option<usize> {
	match degree {
		0 => Some(0),
		1 => Some(3),
		2 => Some(8),
		3 => Some(15),
		_ => None,
	}
}

/// PLY vertex property count (P) to SH degree: `14,23,38,59 -> 0,1,2,3`.
#[inline]
pub fn degree_for_property_count(p: usize) -> Option<u8> {
	match p {
		14 => Some(0),
		23 => Some(1),
		38 => Some(2),
		59 => Some(3),
		_ => None,
	}
}

/// SH degree to PLY vertex property count: `0,1,2,3 -> 14,23,38,59`.
#[inline]
pub fn property_count_for_degree(degree: u8) -> Option<usize> {
	bands_for_degree(degree).map(|k| 14 + 3 * k)
}

/// Options for the linear -> PLY deactivation kernel (§4.1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeactivateOptions {
	pub min_scale: f32,
	pub min_opacity: f32,
	pub max_opacity: f32,
}

impl Default for DeactivateOptions {
	fn default() -> Self {
		Self {
			min_scale: 1e-9,
			min_opacity: 1e-4,
			max_opacity: 1.0 - 1e-4,
		}
	}
}

/// Options for the PLY -> linear activation kernel (§4.1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivateOptions {
	pub min_scale: f32,
	pub max_scale: f32,
	pub min_quat_norm: f32,
}

impl Default for ActivateOptions {
	fn default() -> Self {
		Self {
			min_scale: 1e-4,
			max_scale: 100.0,
			min_quat_norm: 1e-8,
		}
	}
}

/// `scales <- log(max(scales, min_scale))`, `opacities <- logit(clamp(opacities,
/// min_op, max_op), eps=1e-4)`. In place, parallel over points at the caller's
/// discretion (the kernel itself is a single pass with no cross-point state).
pub fn deactivate(scales: &mut [f32], opacities: &mut [f32], opts: DeactivateOptions) {
	trace!(points = opacities.len(), "deactivating scales/opacities to PLY state");

	for s in scales.iter_mut() {
		*s = s.max(opts.min_scale).ln();
	}
	for o in opacities.iter_mut() {
		let clamped = o.clamp(opts.min_opacity, opts.max_opacity);
		*o = logit(clamped, 1e-4);
	}
}

/// `scales <- exp(clamp(scales, log(min_scale), log(max_scale)))`, `opacities
/// <- sigmoid(opacities)`, `quats <- quats / max(norm(quats), min_quat_norm)`.
/// `quats` is row-major `(N, 4)`, w-first.
pub fn activate(scales: &mut [f32], opacities: &mut [f32], quats: &mut [f32], opts: ActivateOptions) {
	trace!(points = opacities.len(), "activating scales/opacities/quats to linear state");

	let lo = opts.min_scale.ln();
	let hi = opts.max_scale.ln();

	for s in scales.iter_mut() {
		*s = s.clamp(lo, hi).exp();
	}
	for o in opacities.iter_mut() {
		*o = sigmoid(*o);
	}
	for q in quats.chunks_exact_mut(4) {
		let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
		let denom = norm.max(opts.min_quat_norm);

		for c in q.iter_mut() {
			*c /= denom;
		}
	}
}
