//! Hooks invoked when the pool detects a fatal condition.
//!
//! The pool always reports the condition here first and then returns the
//! matching [`PoolError`](crate::PoolError) to the caller. A handler that
//! wants the classic behavior terminates the process.

/// Receives out-of-memory and illegal-operation reports from a pool.
pub trait FaultHandler {
  /// No free block can hold `requested` bytes.
  fn on_out_of_memory(
    &mut self,
    requested: usize,
  );

  /// The caller did something the pool refuses to do (double free, foreign
  /// pointer, zero-byte request).
  fn on_illegal_operation(
    &mut self,
    message: &str,
  );
}

/// Logs faults through `tracing` and lets the caller handle the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFaults;

impl FaultHandler for LogFaults {
  fn on_out_of_memory(
    &mut self,
    requested: usize,
  ) {
    tracing::error!(requested, "memory pool out of memory");
  }

  fn on_illegal_operation(
    &mut self,
    message: &str,
  ) {
    tracing::error!(message, "illegal operation");
  }
}

/// Prints the fault to stderr and exits with status 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnFault;

impl FaultHandler for AbortOnFault {
  fn on_out_of_memory(
    &mut self,
    requested: usize,
  ) {
    tracing::error!(requested, "memory pool out of memory, aborting");
    eprintln!("Memory pool out of memory");
    std::process::exit(1);
  }

  fn on_illegal_operation(
    &mut self,
    message: &str,
  ) {
    tracing::error!(message, "illegal operation, aborting");
    if message.is_empty() {
      eprintln!("Unknown illegal operation");
    } else {
      eprintln!("Illegal operation: \"{message}\"");
    }
    std::process::exit(1);
  }
}

impl<H: FaultHandler + ?Sized> FaultHandler for &mut H {
  fn on_out_of_memory(
    &mut self,
    requested: usize,
  ) {
    (**self).on_out_of_memory(requested);
  }

  fn on_illegal_operation(
    &mut self,
    message: &str,
  ) {
    (**self).on_illegal_operation(message);
  }
}
