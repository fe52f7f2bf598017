use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::{Error, Result};

/// Interval between ticks of a clock running at `frequency` Hz, never
/// shorter than a nanosecond.
pub fn period(frequency: u32) -> Duration {
    (Duration::from_secs(1) / frequency.max(1)).max(Duration::from_nanos(1))
}

/// A named thread calling a closure at a fixed frequency.
///
/// A tick that would start more than one period late is skipped rather than
/// run back to back with the previous one.
#[derive(Debug)]
pub struct Clock {
    name: String,
    running: Arc<AtomicBool>,
    missed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Clock {
    pub fn start<F>(name: &str, frequency: u32, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let missed = Arc::new(AtomicU64::new(0));
        let period = period(frequency);

        let handle = {
            let running = Arc::clone(&running);
            let missed = Arc::clone(&missed);
            let label = name.to_owned();
            thread::Builder::new()
                .name(format!("{name}-clock"))
                .spawn(move || {
                    let mut deadline = Instant::now() + period;
                    while running.load(Ordering::SeqCst) {
                        let now = Instant::now();
                        if now < deadline {
                            thread::sleep(deadline - now);
                            continue;
                        }
                        let late = now - deadline;
                        if late > period {
                            let skipped = (late.as_nanos() / period.as_nanos()) as u64;
                            missed.fetch_add(skipped, Ordering::SeqCst);
                            warn!("{label} clock fell {skipped} ticks behind; frequency may be too high");
                            deadline = now;
                        }
                        tick();
                        deadline += period;
                    }
                })
                .map_err(|source| Error::Clock {
                    name: name.to_owned(),
                    source,
                })?
        };

        info!("Started {name} clock [frequency: {frequency} Hz]");
        Ok(Self {
            name: name.to_owned(),
            running,
            missed,
            handle: Some(handle),
        })
    }

    /// Ticks skipped because the clock fell behind.
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::SeqCst)
    }

    /// Disarms the clock and waits for an in-flight tick to finish.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} clock thread panicked", self.name);
            }
            info!("Stopped {} clock", self.name);
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.halt();
    }
}
