//! Process-wide spill statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts every serialized byte ever written to a spill file.
///
/// Shared by all spillers of a factory; the counter only grows.
#[derive(Debug, Default)]
pub struct SpillerStats {
    total_spilled_bytes: AtomicU64,
}

impl SpillerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_total_spilled_bytes(&self, bytes: u64) {
        self.total_spilled_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn total_spilled_bytes(&self) -> u64 {
        self.total_spilled_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_adds_sum() {
        let stats = Arc::new(SpillerStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.add_to_total_spilled_bytes(3);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread panicked");
        }
        assert_eq!(stats.total_spilled_bytes(), 8 * 1000 * 3);
    }
}
