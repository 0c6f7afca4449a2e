//! Pool configuration, loaded once at startup.
//!
//! ```toml
//! pool_size = 65536
//! backing = "mapped"   # or "owned"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
  arena::Arena,
  block::TAG_OVERHEAD,
  error::{PoolError, PoolResult},
};

/// Default arena length in bytes.
pub const POOL_SIZE: usize = 65536;

/// Where the arena's bytes come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backing {
  /// Anonymous `mmap(2)` region.
  #[default]
  Mapped,
  /// Boxed slice from the global allocator.
  Owned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
  /// Arena length in bytes, tags included.
  pub pool_size: usize,
  pub backing: Backing,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      pool_size: POOL_SIZE,
      backing: Backing::default(),
    }
  }
}

impl PoolConfig {
  pub fn from_toml_str(source: &str) -> PoolResult<Self> {
    let config: Self = toml::from_str(source).map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_toml_file(path: impl AsRef<Path>) -> PoolResult<Self> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
      .map_err(|e| PoolError::InvalidConfig(format!("{}: {e}", path.display())))?;
    Self::from_toml_str(&source)
  }

  /// The arena must hold one block with a payload byte, and every offset
  /// must fit the 32-bit tag fields.
  pub fn validate(&self) -> PoolResult<()> {
    validate_arena_len(self.pool_size)
  }

  /// Acquires an arena of the configured size and backing.
  pub fn build_arena(&self) -> PoolResult<Arena> {
    self.validate()?;
    match self.backing {
      Backing::Mapped => Arena::map(self.pool_size),
      Backing::Owned => Ok(Arena::owned(self.pool_size)),
    }
  }
}

pub(crate) fn validate_arena_len(len: usize) -> PoolResult<()> {
  if len <= TAG_OVERHEAD {
    return Err(PoolError::InvalidConfig(format!(
      "pool_size {len} cannot hold a single block (needs more than {TAG_OVERHEAD} bytes)"
    )));
  }
  if len > u32::MAX as usize {
    return Err(PoolError::InvalidConfig(format!(
      "pool_size {len} exceeds the {} byte limit",
      u32::MAX
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = PoolConfig::from_toml_str("").unwrap();
    assert_eq!(config, PoolConfig::default());
    assert_eq!(config.pool_size, 65536);
    assert_eq!(config.backing, Backing::Mapped);
  }

  #[test]
  fn test_parse() {
    let config = PoolConfig::from_toml_str("pool_size = 1024\nbacking = \"owned\"").unwrap();
    assert_eq!(config.pool_size, 1024);
    assert_eq!(config.backing, Backing::Owned);

    let arena = config.build_arena().unwrap();
    assert_eq!(arena.len(), 1024);
    assert!(!arena.is_mapped());
  }

  #[test]
  fn test_rejects_tiny_pool() {
    let err = PoolConfig::from_toml_str("pool_size = 24").unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
  }

  #[test]
  fn test_rejects_unknown_keys() {
    assert!(PoolConfig::from_toml_str("pool = 10").is_err());
    assert!(PoolConfig::from_toml_str("backing = \"stack\"").is_err());
  }

  #[test]
  fn test_missing_file() {
    let err = PoolConfig::from_toml_file("/nonexistent/pool.toml").unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
  }
}
