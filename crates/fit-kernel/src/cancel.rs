use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag.
///
/// Clones share the same flag. Loops poll it at iteration boundaries; a
/// raised flag never interrupts an iteration that is already scoring.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Lower the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}
