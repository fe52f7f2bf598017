use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use log::warn;

use crate::error::{Error, Result};
use crate::Interpreter;

/// Entry point for CPU clock ticks.
///
/// At most one cycle runs at a time. A tick that arrives while a cycle is
/// still in flight is dropped whole and counted as an overrun.
#[derive(Debug)]
pub struct Cpu {
    interpreter: Mutex<Interpreter>,
    overruns: AtomicU64,
}

impl Cpu {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter: Mutex::new(interpreter),
            overruns: AtomicU64::new(0),
        }
    }

    /// Runs one fetch/decode/execute cycle unless another is in flight.
    pub fn cycle(&self) -> Result<()> {
        let mut interpreter = match self.interpreter.try_lock() {
            Ok(interpreter) => interpreter,
            Err(TryLockError::WouldBlock) => {
                self.overruns.fetch_add(1, Ordering::SeqCst);
                return Err(Error::Overrun);
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("Previous cycle panicked; continuing with its state");
                poisoned.into_inner()
            }
        };
        interpreter.step()
    }

    /// Number of cycles dropped because they overlapped a running one.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::SeqCst)
    }

    /// Exclusive access to the machine; CPU ticks are dropped while held.
    pub fn lock(&self) -> MutexGuard<'_, Interpreter> {
        self.interpreter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
