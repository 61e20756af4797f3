// SPDX-License-Identifier: Apache-2.0 OR MIT

use codspeed_criterion_compat::{BenchmarkId, Criterion, Throughput};

use gsply::uncompressed;

use crate::util;

/// Calibrated against §4.4's 50M pts/s read target.
pub fn bench_uncompressed_read(c: &mut Criterion) {
	let mut group = c.benchmark_group("uncompressed_read");

	for n in [1_000usize, 50_000] {
		let mut cloud = util::random_cloud(n, 2);
		let path = util::tmpfile(&format!("uncompressed_read_{n}.ply"));

		uncompressed::write(&path, &mut cloud).unwrap();

		group.throughput(Throughput::Elements(n as u64));
		group.bench_with_input(BenchmarkId::from_parameter(n), &path, |b, path| {
			b.iter(|| uncompressed::read(path).unwrap());
		});

		let _ = std::fs::remove_file(&path);
	}
	group.finish();
}

/// Calibrated against §4.4's 20M pts/s write target.
pub fn bench_uncompressed_write(c: &mut Criterion) {
	let mut group = c.benchmark_group("uncompressed_write");

	for n in [1_000usize, 50_000] {
		let cloud = util::random_cloud(n, 2);
		let path = util::tmpfile(&format!("uncompressed_write_{n}.ply"));

		group.throughput(Throughput::Elements(n as u64));
		group.bench_with_input(BenchmarkId::from_parameter(n), &cloud, |b, cloud| {
			b.iter(|| {
				let mut cloud = cloud.clone();
				uncompressed::write(&path, &mut cloud).unwrap();
			});
		});

		let _ = std::fs::remove_file(&path);
	}
	group.finish();
}
