// SPDX-License-Identifier: Apache-2.0 OR MIT

use codspeed_criterion_compat::{BenchmarkId, Criterion, Throughput};

use gsply::bytes;

use crate::util;

pub fn bench_chunked_compress(c: &mut Criterion) {
	let mut group = c.benchmark_group("chunked_compress");

	for n in [1_000usize, 50_000] {
		let cloud = util::random_cloud(n, 2);

		group.throughput(Throughput::Elements(n as u64));
		group.bench_with_input(BenchmarkId::from_parameter(n), &cloud, |b, cloud| {
			b.iter(|| {
				let mut cloud = cloud.clone();
				bytes::compress_to_bytes(&mut cloud).unwrap()
			});
		});
	}
	group.finish();
}

pub fn bench_chunked_decompress(c: &mut Criterion) {
	let mut group = c.benchmark_group("chunked_decompress");

	for n in [1_000usize, 50_000] {
		let mut cloud = util::random_cloud(n, 2);
		let encoded = bytes::compress_to_bytes(&mut cloud).unwrap();

		group.throughput(Throughput::Elements(n as u64));
		group.bench_with_input(BenchmarkId::from_parameter(n), &encoded, |b, encoded| {
			b.iter(|| bytes::decompress_from_bytes(encoded).unwrap());
		});
	}
	group.finish();
}
