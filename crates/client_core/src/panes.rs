use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use shared::domain::PaneCount;
use tracing::debug;

use crate::TitleDelegate;

/// Bounded pane counter; the owner is told about every accepted change.
/// No lock is held while the owner is notified.
pub struct PaneCountController {
    count: AtomicU8,
    delegate: Arc<dyn TitleDelegate>,
}

impl PaneCountController {
    pub fn new(count: PaneCount, delegate: Arc<dyn TitleDelegate>) -> Self {
        Self {
            count: AtomicU8::new(count.get()),
            delegate,
        }
    }

    pub fn count(&self) -> PaneCount {
        PaneCount::new(self.count.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Owner-driven update, e.g. after it re-renders with a new count.
    pub fn set(&self, count: PaneCount) {
        self.count.store(count.get(), Ordering::Release);
    }

    pub fn increment(&self) -> Option<PaneCount> {
        self.step(PaneCount::checked_increment)
    }

    pub fn decrement(&self) -> Option<PaneCount> {
        self.step(PaneCount::checked_decrement)
    }

    fn step(&self, next: fn(PaneCount) -> Option<PaneCount>) -> Option<PaneCount> {
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                next(PaneCount::new(raw).ok()?).map(PaneCount::get)
            })
            .ok()?;
        let previous = PaneCount::new(previous).ok()?;
        let updated = next(previous)?;
        debug!(from = %previous, to = %updated, "pane count changed");
        self.delegate.on_pane_count_change(updated);
        Some(updated)
    }
}
