//! Allocate/deallocate churn over a 64 KiB pool.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use poolalloc::{Arena, MemoryPool, POOL_SIZE};

fn bench_alloc_free_pair(c: &mut Criterion) {
  let mut pool = MemoryPool::initialize(Arena::owned(POOL_SIZE)).unwrap();

  c.bench_function("allocate_deallocate_64", |b| {
    b.iter(|| {
      let payload = pool.allocate(black_box(64)).unwrap();
      pool.deallocate(Some(payload)).unwrap();
    });
  });
}

fn bench_fragmented_churn(c: &mut Criterion) {
  let mut pool = MemoryPool::initialize(Arena::owned(POOL_SIZE)).unwrap();

  // Leave a checkerboard of holes so first-fit has to walk.
  let held: Vec<_> = (0..200).map(|i| pool.allocate(16 + i % 48).unwrap()).collect();
  for payload in held.iter().step_by(2) {
    pool.deallocate(Some(*payload)).unwrap();
  }

  c.bench_function("fragmented_allocate_deallocate", |b| {
    b.iter(|| {
      let payload = pool.allocate(black_box(40)).unwrap();
      pool.deallocate(Some(payload)).unwrap();
    });
  });
}

criterion_group!(benches, bench_alloc_free_pair, bench_fragmented_churn);
criterion_main!(benches);
