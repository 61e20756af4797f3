// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The in-memory Gaussian-splat point cloud: [`GsContainer`].
//!
//! A container owns either a single row-major `(N, P)` float32 buffer that
//! every field (other than `quats`, see below) is a strided window into, or
//! a set of individually-owned per-field arrays produced by concatenation,
//! masking, or [`GsContainer::from_arrays`]. [`GsContainer::make_contiguous`]
//! converts the former into the latter.
//!
//! `quats` is always materialized eagerly in container order (`w,x,y,z`)
//! rather than windowed, since the uncompressed wire order (`x,y,z,w`)
//! differs from the container order; everything else happens to share
//! column order with the wire layout and can stay a true window.

use crate::error::{GsplyError, Result};
use crate::numerics::{self, ActivateOptions, DeactivateOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleFormat {
	Log,
	Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpacityFormat {
	Logit,
	Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sh0Format {
	Sh,
	Rgb,
}

/// `{scales, opacities, sh0}` format-state triple (§3). Quaternion order is
/// always w-first and is not tracked here since it never varies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatState {
	pub scales: ScaleFormat,
	pub opacities: OpacityFormat,
	pub sh0: Sh0Format,
}

impl FormatState {
	/// The state a container must be in before it can be written as PLY.
	pub const PLY: Self = Self {
		scales: ScaleFormat::Log,
		opacities: OpacityFormat::Logit,
		sh0: Sh0Format::Sh,
	};

	pub fn is_ply(&self) -> bool {
		*self == Self::PLY
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskMode {
	And,
	Or,
}

/// Row-major `(N, P)` buffer plus the column offsets of each field, used by
/// the zero-copy read path (C4/C5 decoders hand back one of these).
#[derive(Clone)]
struct WindowedBacking {
	buf: Vec<f32>,
	stride: usize,
	means_off: usize,
	sh0_off: usize,
	sh_rest_off: usize,
	sh_rest_width: usize,
	opacity_off: usize,
	scales_off: usize,
}

#[derive(Clone)]
struct OwnedFields {
	means: Vec<f32>,
	scales: Vec<f32>,
	opacities: Vec<f32>,
	sh0: Vec<f32>,
	sh_rest: Vec<f32>,
}

#[derive(Clone)]
enum Storage {
	Windowed(WindowedBacking),
	Owned(OwnedFields),
}

#[derive(Clone)]
pub struct GsContainer {
	n: usize,
	sh_degree: u8,
	storage: Storage,
	/// Always owned (w,x,y,z order), materialized once at construction time.
	quats: Vec<f32>,
	format_state: FormatState,
	mask_layers: Vec<(String, Vec<bool>)>,
}

/// Non-owning, row-stride window over one field of a [`WindowedBacking`].
pub struct StridedView<'a> {
	base: &'a [f32],
	offset: usize,
	stride: usize,
	width: usize,
	len: usize,
}

impl<'a> StridedView<'a> {
	#[inline]
	pub fn row(&self, i: usize) -> &[f32] {
		let start = self.offset + i * self.stride;

		&self.base[start..start + self.width]
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn iter(&self) -> impl Iterator<Item = &[f32]> + '_ {
		(0..self.len).map(move |i| self.row(i))
	}

	/// Copies this view into a freshly-allocated contiguous `Vec<f32>`.
	pub fn to_owned_vec(&self) -> Vec<f32> {
		let mut out = Vec::with_capacity(self.len * self.width);

		for row in self.iter() {
			out.extend_from_slice(row);
		}
		out
	}
}

impl GsContainer {
	/// Non-copying construction from a row-major `(N, P)` float32 buffer,
	/// where `P` is implied by `degree` (§4.1's property-count table). This is
	/// the uncompressed codec's zero-copy read path: every field other than
	/// `quats` stays a window into `buf`.
	pub fn from_base(buf: Vec<f32>, n: usize, degree: u8, quats_wire_xyzw: &[f32]) -> Result<Self> {
		let k = numerics::bands_for_degree(degree)
			.ok_or_else(|| GsplyError::UnsupportedSchema(format!("invalid sh degree {degree}")))?;
		let p = 14 + 3 * k;

		if buf.len() != n * p {
			return Err(GsplyError::SizeMismatch {
				expected: n * p,
				actual: buf.len(),
				context: "from_base: buffer length vs N*P".into(),
			});
		}
		if quats_wire_xyzw.len() != n * 4 {
			return Err(GsplyError::SizeMismatch {
				expected: n * 4,
				actual: quats_wire_xyzw.len(),
				context: "from_base: quaternion buffer length".into(),
			});
		}

		let mut quats = vec![0.0_f32; n * 4];

		for i in 0..n {
			let src = &quats_wire_xyzw[i * 4..i * 4 + 4];

			quats[i * 4] = src[3]; // w
			quats[i * 4 + 1] = src[0]; // x
			quats[i * 4 + 2] = src[1]; // y
			quats[i * 4 + 3] = src[2]; // z
		}

		let backing = WindowedBacking {
			buf,
			stride: p,
			means_off: 0,
			sh0_off: 3,
			sh_rest_off: 6,
			sh_rest_width: 3 * k,
			opacity_off: 6 + 3 * k,
			scales_off: 7 + 3 * k,
		};

		Ok(Self {
			n,
			sh_degree: degree,
			storage: Storage::Windowed(backing),
			quats,
			format_state: FormatState::PLY,
			mask_layers: Vec::new(),
		})
	}

	/// Construction from individually-owned arrays. `sh_rest` is planar
	/// (all R, then all G, then all B), length `n * 3 * bands(degree)`.
	#[allow(clippy::too_many_arguments)]
	pub fn from_arrays(
		means: Vec<f32>,
		scales: Vec<f32>,
		quats: Vec<f32>,
		opacities: Vec<f32>,
		sh0: Vec<f32>,
		sh_rest: Vec<f32>,
		format_state: FormatState,
	) -> Result<Self> {
		if means.len() % 3 != 0 {
			return Err(GsplyError::DomainError("means length not a multiple of 3".into()));
		}
		let n = means.len() / 3;

		let expect = |name: &str, len: usize, width: usize| -> Result<()> {
			if len != n * width {
				return Err(GsplyError::DomainError(format!(
					"{name} length {len} inconsistent with N={n} (expected {})",
					n * width
				)));
			}
			Ok(())
		};

		expect("scales", scales.len(), 3)?;
		expect("quats", quats.len(), 4)?;
		expect("opacities", opacities.len(), 1)?;
		expect("sh0", sh0.len(), 3)?;

		let k = if n == 0 {
			sh_rest.len() / 3
		} else {
			sh_rest.len() / (3 * n)
		};

		if sh_rest.len() != n * 3 * k {
			return Err(GsplyError::DomainError("sh_rest length not divisible evenly by N".into()));
		}
		let degree = numerics::degree_for_bands(k)
			.ok_or_else(|| GsplyError::UnsupportedSchema(format!("invalid sh band count {k}")))?;

		Ok(Self {
			n,
			sh_degree: degree,
			storage: Storage::Owned(OwnedFields {
				means,
				scales,
				opacities,
				sh0,
				sh_rest,
			}),
			quats,
			format_state,
			mask_layers: Vec::new(),
		})
	}

	pub fn n(&self) -> usize {
		self.n
	}

	pub fn get_sh_degree(&self) -> u8 {
		self.sh_degree
	}

	pub fn sh_bands(&self) -> usize {
		numerics::bands_for_degree(self.sh_degree).unwrap_or(0)
	}

	pub fn format_state(&self) -> FormatState {
		self.format_state
	}

	pub fn means(&self) -> StridedView<'_> {
		match &self.storage {
			Storage::Windowed(w) => StridedView {
				base: &w.buf,
				offset: w.means_off,
				stride: w.stride,
				width: 3,
				len: self.n,
			},
			Storage::Owned(o) => StridedView {
				base: &o.means,
				offset: 0,
				stride: 3,
				width: 3,
				len: self.n,
			},
		}
	}

	pub fn scales(&self) -> StridedView<'_> {
		match &self.storage {
			Storage::Windowed(w) => StridedView {
				base: &w.buf,
				offset: w.scales_off,
				stride: w.stride,
				width: 3,
				len: self.n,
			},
			Storage::Owned(o) => StridedView {
				base: &o.scales,
				offset: 0,
				stride: 3,
				width: 3,
				len: self.n,
			},
		}
	}

	pub fn opacities(&self) -> StridedView<'_> {
		match &self.storage {
			Storage::Windowed(w) => StridedView {
				base: &w.buf,
				offset: w.opacity_off,
				stride: w.stride,
				width: 1,
				len: self.n,
			},
			Storage::Owned(o) => StridedView {
				base: &o.opacities,
				offset: 0,
				stride: 1,
				width: 1,
				len: self.n,
			},
		}
	}

	pub fn sh0(&self) -> StridedView<'_> {
		match &self.storage {
			Storage::Windowed(w) => StridedView {
				base: &w.buf,
				offset: w.sh0_off,
				stride: w.stride,
				width: 3,
				len: self.n,
			},
			Storage::Owned(o) => StridedView {
				base: &o.sh0,
				offset: 0,
				stride: 3,
				width: 3,
				len: self.n,
			},
		}
	}

	/// Planar (R-then-G-then-B) higher SH bands, width `3*bands(degree)`.
	pub fn sh_rest(&self) -> StridedView<'_> {
		match &self.storage {
			Storage::Windowed(w) => StridedView {
				base: &w.buf,
				offset: w.sh_rest_off,
				stride: w.stride,
				width: w.sh_rest_width,
				len: self.n,
			},
			Storage::Owned(o) => {
				let width = 3 * self.sh_bands();

				StridedView {
					base: &o.sh_rest,
					offset: 0,
					stride: width.max(1),
					width,
					len: self.n,
				}
			},
		}
	}

	/// Quaternions, w-first, width 4.
	pub fn quats(&self) -> StridedView<'_> {
		StridedView {
			base: &self.quats,
			offset: 0,
			stride: 4,
			width: 4,
			len: self.n,
		}
	}

	/// Re-materializes any windowed fields as standalone, contiguous owned
	/// arrays. A no-op if the container is already `Owned`.
	pub fn make_contiguous(&mut self) {
		if let Storage::Windowed(_) = &self.storage {
			let means = self.means().to_owned_vec();
			let scales = self.scales().to_owned_vec();
			let opacities = self.opacities().to_owned_vec();
			let sh0 = self.sh0().to_owned_vec();
			let sh_rest = self.sh_rest().to_owned_vec();

			self.storage = Storage::Owned(OwnedFields {
				means,
				scales,
				opacities,
				sh0,
				sh_rest,
			});
		}
	}

	/// Applies the §4.1 deactivate kernel (linear -> PLY). Forces
	/// [`Self::make_contiguous`] first since the kernel needs contiguous
	/// per-field slices.
	pub fn apply_deactivate(&mut self, opts: DeactivateOptions) {
		self.make_contiguous();

		if let Storage::Owned(o) = &mut self.storage {
			numerics::deactivate(&mut o.scales, &mut o.opacities, opts);
		}
		self.format_state.scales = ScaleFormat::Log;
		self.format_state.opacities = OpacityFormat::Logit;
	}

	/// Applies the §4.1 activate kernel (PLY -> linear), including
	/// quaternion normalization.
	pub fn apply_activate(&mut self, opts: ActivateOptions) {
		self.make_contiguous();

		if let Storage::Owned(o) = &mut self.storage {
			numerics::activate(&mut o.scales, &mut o.opacities, &mut self.quats, opts);
		}
		self.format_state.scales = ScaleFormat::Linear;
		self.format_state.opacities = OpacityFormat::Linear;
	}

	/// Ensures the container is in PLY format-state, normalizing in place
	/// (via [`Self::apply_deactivate`]) if it isn't. Writers call this before
	/// emission; see §3 "Write operations must ensure the format-state is
	/// PLY... before emission".
	pub fn ensure_ply_state(&mut self) -> Result<()> {
		if self.format_state.is_ply() {
			return Ok(());
		}
		if self.format_state.sh0 != Sh0Format::Sh {
			return Err(GsplyError::StateError(
				"cannot auto-normalize sh0 from RGB to SH; caller must convert explicitly".into(),
			));
		}
		self.apply_deactivate(DeactivateOptions::default());
		Ok(())
	}

	pub fn add_mask_layer(&mut self, name: impl Into<String>, mask: Vec<bool>) -> Result<()> {
		if mask.len() != self.n {
			return Err(GsplyError::DomainError(format!(
				"mask layer length {} does not match N={}",
				mask.len(),
				self.n
			)));
		}
		let name = name.into();

		if self.mask_layers.iter().any(|(n, _)| *n == name) {
			return Err(GsplyError::DomainError(format!("mask layer '{name}' already exists")));
		}
		self.mask_layers.push((name, mask));
		Ok(())
	}

	pub fn mask_layer(&self, name: &str) -> Result<&[bool]> {
		self.mask_layers
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, m)| m.as_slice())
			.ok_or_else(|| GsplyError::DomainError(format!("unknown mask layer '{name}'")))
	}

	pub fn combine_masks(&self, mode: MaskMode, layers: Option<&[String]>) -> Result<Vec<bool>> {
		let names: Vec<&str> = match layers {
			Some(ls) => ls.iter().map(String::as_str).collect(),
			None => self.mask_layers.iter().map(|(n, _)| n.as_str()).collect(),
		};

		let mut out = vec![mode == MaskMode::And; self.n];

		for name in names {
			let layer = self.mask_layer(name)?;

			for i in 0..self.n {
				out[i] = match mode {
					MaskMode::And => out[i] && layer[i],
					MaskMode::Or => out[i] || layer[i],
				};
			}
		}
		Ok(out)
	}

	/// Returns a fresh container containing only the points where `mask[i]`
	/// is true. The result has no backing and its mask layers are the
	/// corresponding slices of this container's layers.
	pub fn apply_mask(&self, mask: &[bool]) -> Result<Self> {
		if mask.len() != self.n {
			return Err(GsplyError::DomainError(format!(
				"mask length {} does not match N={}",
				mask.len(),
				self.n
			)));
		}

		let keep: Vec<usize> = (0..self.n).filter(|&i| mask[i]).collect();
		let gather = |view: StridedView<'_>| -> Vec<f32> {
			let mut out = Vec::with_capacity(keep.len() * view.width);

			for &i in &keep {
				out.extend_from_slice(view.row(i));
			}
			out
		};

		let means = gather(self.means());
		let scales = gather(self.scales());
		let opacities = gather(self.opacities());
		let sh0 = gather(self.sh0());
		let sh_rest = gather(self.sh_rest());
		let quats = gather(self.quats());

		let mask_layers = self
			.mask_layers
			.iter()
			.map(|(name, layer)| (name.clone(), keep.iter().map(|&i| layer[i]).collect()))
			.collect();

		Ok(Self {
			n: keep.len(),
			sh_degree: self.sh_degree,
			storage: Storage::Owned(OwnedFields {
				means,
				scales,
				opacities,
				sh0,
				sh_rest,
			}),
			quats,
			format_state: self.format_state,
			mask_layers,
		})
	}

	/// Bulk-allocating concatenation of containers that share an SH degree.
	/// Mask layers are merged by name; a layer missing on some input is
	/// filled with `true` for that input's points.
	pub fn concat(containers: &[GsContainer]) -> Result<Self> {
		if containers.is_empty() {
			return Err(GsplyError::DomainError("concat of zero containers".into()));
		}
		let degree = containers[0].sh_degree;

		if containers.iter().any(|c| c.sh_degree != degree) {
			return Err(GsplyError::DomainError("concat requires all containers to share an SH degree".into()));
		}

		let total_n: usize = containers.iter().map(|c| c.n).sum();
		let mut means = Vec::with_capacity(total_n * 3);
		let mut scales = Vec::with_capacity(total_n * 3);
		let mut opacities = Vec::with_capacity(total_n);
		let mut sh0 = Vec::with_capacity(total_n * 3);
		let mut sh_rest = Vec::with_capacity(total_n * 3 * numerics::bands_for_degree(degree).unwrap_or(0));
		let mut quats = Vec::with_capacity(total_n * 4);

		for c in containers {
			for row in c.means().iter() {
				means.extend_from_slice(row);
			}
			for row in c.scales().iter() {
				scales.extend_from_slice(row);
			}
			for row in c.opacities().iter() {
				opacities.extend_from_slice(row);
			}
			for row in c.sh0().iter() {
				sh0.extend_from_slice(row);
			}
			for row in c.sh_rest().iter() {
				sh_rest.extend_from_slice(row);
			}
			for row in c.quats().iter() {
				quats.extend_from_slice(row);
			}
		}

		let mut names: Vec<String> = Vec::new();

		for c in containers {
			for (name, _) in &c.mask_layers {
				if !names.contains(name) {
					names.push(name.clone());
				}
			}
		}

		let mut mask_layers = Vec::with_capacity(names.len());

		for name in names {
			let mut merged = Vec::with_capacity(total_n);

			for c in containers {
				match c.mask_layers.iter().find(|(n, _)| *n == name) {
					Some((_, layer)) => merged.extend_from_slice(layer),
					None => merged.extend(std::iter::repeat(true).take(c.n)),
				}
			}
			mask_layers.push((name, merged));
		}

		Ok(Self {
			n: total_n,
			sh_degree: degree,
			storage: Storage::Owned(OwnedFields {
				means,
				scales,
				opacities,
				sh0,
				sh_rest,
			}),
			quats,
			format_state: containers[0].format_state,
			mask_layers,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn make_degree0(n: usize) -> GsContainer {
		GsContainer::from_arrays(
			vec![0.0; n * 3],
			vec![0.0; n * 3],
			{
				let mut q = Vec::with_capacity(n * 4);
				for _ in 0..n {
					q.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]);
				}
				q
			},
			vec![0.0; n],
			vec![0.0; n * 3],
			vec![],
			FormatState::PLY,
		)
		.unwrap()
	}

	#[test]
	fn test_from_arrays_degree_zero() {
		let c = make_degree0(4);

		assert_eq!(c.n(), 4);
		assert_eq!(c.get_sh_degree(), 0);
	}

	#[test]
	fn test_from_arrays_rejects_length_mismatch() {
		let err = GsContainer::from_arrays(
			vec![0.0; 9],
			vec![0.0; 12], // wrong: should be 9
			vec![0.0; 12],
			vec![0.0; 3],
			vec![0.0; 9],
			vec![],
			FormatState::PLY,
		)
		.unwrap_err();

		assert!(matches!(err, GsplyError::DomainError(_)));
	}

	#[test]
	fn test_mask_layer_length_mismatch_is_domain_error() {
		let mut c = make_degree0(3);
		let err = c.add_mask_layer("visible", vec![true, false]).unwrap_err();

		assert!(matches!(err, GsplyError::DomainError(_)));
	}

	#[test]
	fn test_unknown_mask_layer_is_domain_error() {
		let c = make_degree0(3);
		let err = c.mask_layer("nope").unwrap_err();

		assert!(matches!(err, GsplyError::DomainError(_)));
	}

	#[test]
	fn test_apply_mask_filters_points() {
		let mut c = make_degree0(3);

		c.add_mask_layer("keep", vec![true, false, true]).unwrap();
		let mask = c.combine_masks(MaskMode::And, None).unwrap();
		let filtered = c.apply_mask(&mask).unwrap();

		assert_eq!(filtered.n(), 2);
	}

	#[test]
	fn test_concat_merges_mask_layers_by_name_with_true_fill() {
		let mut a = make_degree0(2);
		let b = make_degree0(3);

		a.add_mask_layer("only_in_a", vec![true, false]).unwrap();

		let merged = GsContainer::concat(&[a, b]).unwrap();

		assert_eq!(merged.n(), 5);
		let layer = merged.mask_layer("only_in_a").unwrap();

		assert_eq!(layer, &[true, false, true, true, true]);
	}

	#[test]
	fn test_concat_rejects_mismatched_degree() {
		let degree0 = make_degree0(1);
		let degree1 = GsContainer::from_arrays(
			vec![0.0; 3],
			vec![0.0; 3],
			vec![1.0, 0.0, 0.0, 0.0],
			vec![0.0],
			vec![0.0; 3],
			vec![0.0; 9], // degree 1: K=3, width 3*3=9
			FormatState::PLY,
		)
		.unwrap();

		let err = GsContainer::concat(&[degree0, degree1]).unwrap_err();

		assert!(matches!(err, GsplyError::DomainError(_)));
	}

	#[test]
	fn test_make_contiguous_preserves_values() {
		let buf_n = 2usize;
		let p = 14; // degree 0
		let mut buf = vec![0.0_f32; buf_n * p];

		buf[0] = 1.0; // means.x of point 0
		buf[p] = 2.0; // means.x of point 1

		let quats_wire = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
		let mut c = GsContainer::from_base(buf, buf_n, 0, &quats_wire).unwrap();

		c.make_contiguous();

		assert_eq!(c.means().row(0)[0], 1.0);
		assert_eq!(c.means().row(1)[0], 2.0);
		assert_eq!(c.quats().row(0), [1.0, 0.0, 0.0, 0.0]);
	}
}
