//! End-to-end scenarios over the public pool API.

use poolalloc::{Arena, BlockState, FaultHandler, MemoryPool, POOL_SIZE, PoolConfig, PoolError, TAG_OVERHEAD};

#[derive(Default)]
struct Intercept {
  out_of_memory: usize,
  illegal: usize,
}

impl FaultHandler for Intercept {
  fn on_out_of_memory(
    &mut self,
    _requested: usize,
  ) {
    self.out_of_memory += 1;
  }

  fn on_illegal_operation(
    &mut self,
    _message: &str,
  ) {
    self.illegal += 1;
  }
}

fn intercepted() -> MemoryPool<Intercept> {
  MemoryPool::with_handler(Arena::map(POOL_SIZE).unwrap(), Intercept::default()).unwrap()
}

#[test]
fn test_long_and_string_scenario() {
  for reverse in [false, true] {
    let mut pool = intercepted();
    assert_eq!(pool.free_remaining(), POOL_SIZE - TAG_OVERHEAD);

    let number = pool.allocate(std::mem::size_of::<u64>()).unwrap();
    let string = pool.allocate(255).unwrap();

    pool
      .payload_mut(number)
      .unwrap()
      .copy_from_slice(&0xDEADBEEFu64.to_le_bytes());

    let text = b"If your happy and you know it, clap your hands\0";
    pool.payload_mut(string).unwrap()[..text.len()].copy_from_slice(text);

    assert_eq!(pool.free_remaining(), POOL_SIZE - 8 - 255 - 3 * TAG_OVERHEAD);
    assert_eq!(pool.payload(number).unwrap(), &0xDEADBEEFu64.to_le_bytes());
    assert_eq!(&pool.payload(string).unwrap()[..text.len()], text);

    let order = if reverse { [string, number] } else { [number, string] };
    for payload in order {
      pool.deallocate(Some(payload)).unwrap();
      pool.verify().unwrap();
    }

    assert_eq!(pool.largest_free(), POOL_SIZE - TAG_OVERHEAD);
    assert_eq!(pool.free_block_count(), 1);
    assert_eq!(pool.handler().illegal, 0);
  }
}

#[test]
fn test_round_trip_restores_total_free() {
  let mut pool = intercepted();
  let _keep = pool.allocate(1000).unwrap();
  let before = pool.total_free();

  let temp = pool.allocate(300).unwrap();
  assert_eq!(pool.total_free(), before - 300 - TAG_OVERHEAD);

  pool.deallocate(Some(temp)).unwrap();
  assert_eq!(pool.total_free(), before);
  pool.verify().unwrap();
}

#[test]
fn test_exhaustion_is_intercepted() {
  let mut pool = intercepted();
  let largest = pool.largest_free();

  assert!(matches!(
    pool.allocate(largest + 1),
    Err(PoolError::OutOfMemory { requested, .. }) if requested == largest + 1
  ));
  assert_eq!(pool.handler().out_of_memory, 1);

  // The pool is still fully usable afterwards.
  assert_eq!(pool.largest_free(), largest);
  assert_eq!(pool.free_remaining(), largest);
  let all = pool.allocate(largest).unwrap();
  pool.deallocate(Some(all)).unwrap();
  pool.verify().unwrap();
}

#[test]
fn test_fill_until_exhausted_then_drain() {
  let mut pool = intercepted();
  let mut live = Vec::new();

  loop {
    match pool.allocate(100) {
      Ok(payload) => live.push(payload),
      Err(PoolError::OutOfMemory { .. }) => break,
      Err(other) => panic!("unexpected error: {other}"),
    }
  }

  assert_eq!(pool.handler().out_of_memory, 1);
  assert!(pool.largest_free() < 100);
  pool.verify().unwrap();

  // Free odd slots first so every merge happens on both sides later.
  for payload in live.iter().skip(1).step_by(2) {
    pool.deallocate(Some(*payload)).unwrap();
  }
  pool.verify().unwrap();
  assert!(pool.free_block_count() >= live.len() / 2);

  for payload in live.iter().step_by(2) {
    pool.deallocate(Some(*payload)).unwrap();
  }
  pool.verify().unwrap();

  let blocks: Vec<_> = pool.blocks().collect();
  assert_eq!(blocks.len(), 1);
  assert_eq!(blocks[0].state, BlockState::Free);
  assert_eq!(blocks[0].size, pool.capacity());
}

#[test]
fn test_double_free_is_intercepted() {
  let mut pool = intercepted();
  let a = pool.allocate(64).unwrap();
  let _b = pool.allocate(64).unwrap();

  pool.deallocate(Some(a)).unwrap();
  let snapshot: Vec<_> = pool.blocks().collect();

  // `a` sits at the tail next to a used block, so it stays a 64-byte hole.
  let freed = snapshot.iter().find(|block| block.is_free() && block.size == 64).unwrap();
  assert_eq!(freed.payload(), a);

  assert!(matches!(pool.deallocate(Some(freed.payload())), Err(PoolError::DoubleFree { .. })));
  assert_eq!(pool.handler().illegal, 1);
  assert_eq!(pool.blocks().collect::<Vec<_>>(), snapshot);
}

#[test]
fn test_pool_from_toml() {
  let config = PoolConfig::from_toml_str("pool_size = 2048\nbacking = \"owned\"").unwrap();
  let mut pool = MemoryPool::from_config(&config).unwrap();

  assert_eq!(pool.arena_len(), 2048);
  let a = pool.allocate(2048 - TAG_OVERHEAD).unwrap();
  assert_eq!(pool.free_block_count(), 0);
  assert_eq!(pool.smallest_free(), 0);
  pool.deallocate(Some(a)).unwrap();
  assert_eq!(pool.free_remaining(), 2048 - TAG_OVERHEAD);
}
