use poolalloc::{AbortOnFault, MemoryPool, PoolConfig};
use tracing_subscriber::EnvFilter;

/// Prints every block of the arena in address order.
fn print_blocks(pool: &MemoryPool<AbortOnFault>) {
  for block in pool.blocks() {
    println!(
      "  header @ {:>5}  payload {:>5} bytes  {:?}",
      block.offset, block.size, block.state
    );
  }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  // Optional first argument: a TOML file with `pool_size` and `backing`.
  let config = match std::env::args().nth(1) {
    Some(path) => PoolConfig::from_toml_file(path)?,
    None => PoolConfig::default(),
  };

  let mut pool = MemoryPool::with_handler(config.build_arena()?, AbortOnFault)?;

  println!("Free memory = {}", pool.free_remaining());

  let number = pool.allocate(std::mem::size_of::<u64>())?;
  let string = pool.allocate(255)?;

  pool
    .payload_mut(number)?
    .copy_from_slice(&0xDEADBEEFu64.to_le_bytes());

  let text = b"If your happy and you know it, clap your hands";
  pool.payload_mut(string)?[..text.len()].copy_from_slice(text);

  println!("Free memory = {}", pool.free_remaining());
  println!("Largest free = {}, smallest free = {}", pool.largest_free(), pool.smallest_free());
  print_blocks(&pool);

  pool.deallocate(Some(number))?;
  pool.deallocate(Some(string))?;

  println!("After deallocation:");
  print_blocks(&pool);

  Ok(())
}
