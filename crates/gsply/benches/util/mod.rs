// SPDX-License-Identifier: Apache-2.0 OR MIT

use rand::{Rng, SeedableRng, rngs::StdRng};

use gsply::container::{FormatState, GsContainer, OpacityFormat, ScaleFormat, Sh0Format};
use gsply::numerics;

/// Builds a synthetic, PLY-state container of `n` random points at `degree`,
/// seeded for reproducible benchmark runs.
pub fn random_cloud(n: usize, degree: u8) -> GsContainer {
	let k = numerics::bands_for_degree(degree).unwrap();
	let mut rng = StdRng::seed_from_u64(42);

	let means: Vec<f32> = (0..n * 3).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();
	let scales: Vec<f32> = (0..n * 3).map(|_| rng.random::<f32>() * 2.0 - 4.0).collect();
	let mut quats = Vec::with_capacity(n * 4);
	for _ in 0..n {
		let raw: [f32; 4] = [rng.random(), rng.random(), rng.random(), rng.random()];
		let norm = (raw[0] * raw[0] + raw[1] * raw[1] + raw[2] * raw[2] + raw[3] * raw[3]).sqrt().max(1e-8);
		quats.extend(raw.map(|c| c / norm));
	}
	let opacities: Vec<f32> = (0..n).map(|_| numerics::logit(rng.random::<f32>(), 1e-4)).collect();
	let sh0: Vec<f32> = (0..n * 3).map(|_| rng.random::<f32>() - 0.5).collect();
	let sh_rest: Vec<f32> = (0..n * 3 * k).map(|_| rng.random::<f32>() - 0.5).collect();

	GsContainer::from_arrays(
		means,
		scales,
		quats,
		opacities,
		sh0,
		sh_rest,
		FormatState {
			scales: ScaleFormat::Log,
			opacities: OpacityFormat::Logit,
			sh0: Sh0Format::Sh,
		},
	)
	.unwrap()
}

pub fn tmpfile(name: &str) -> std::path::PathBuf {
	std::env::temp_dir().join(format!("gsply_bench_{}_{}", std::process::id(), name))
}
