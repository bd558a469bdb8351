use std::sync::atomic::{AtomicBool, Ordering};

/// Page-wide "user has interacted" flag with a one-shot init lifecycle.
///
/// Set once, read many times, reset only with the page itself. Injected
/// into the components that need it rather than read through a global; the
/// embedder detaches its input listeners after the first mark.
#[derive(Debug, Default)]
pub struct InteractionFlag {
    seen: AtomicBool,
}

impl InteractionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_interacted(&self) -> bool {
        self.seen.load(Ordering::Relaxed)
    }

    /// Returns true for the first mark only.
    pub fn mark_interacted(&self) -> bool {
        !self.seen.swap(true, Ordering::Relaxed)
    }
}
