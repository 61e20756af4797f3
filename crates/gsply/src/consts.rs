// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Zeroth-order spherical harmonic basis constant `Y_0^0`.
///
/// `sh2rgb` / `rgb2sh` use this exact value for interoperability with the
/// PlayCanvas SuperSplat reference encoder; unlike a headroom-adjusted scale,
/// there is no slack here, so keep this constant wherever SH0 is converted.
pub const SH_C0: f32 = 0.282_094_791_773_878_14;

/// Number of points per chunk in the chunked (quantized) codec.
pub const CHUNK_SIZE: usize = 256;

/// File extension used for both wire formats; the two are distinguished by
/// probing the header, not by extension.
pub const EXTENSION: &str = "ply";
