//! Viewport resize events and the mobile-width detector built on them.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use tracing::debug;

/// Widths at or below this are treated as mobile.
pub const MOBILE_BREAKPOINT: u32 = 768;

pub fn is_mobile_width(width: u32) -> bool {
    width <= MOBILE_BREAKPOINT
}

type ResizeListener = Arc<dyn Fn(u32) + Send + Sync>;

struct ViewportInner {
    width: AtomicU32,
    next_listener_id: AtomicU64,
    listeners: Mutex<HashMap<u64, ResizeListener>>,
}

impl ViewportInner {
    fn listeners(&self) -> MutexGuard<'_, HashMap<u64, ResizeListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Source of resize events. Clones share the same width and listeners.
#[derive(Clone)]
pub struct Viewport {
    inner: Arc<ViewportInner>,
}

impl Viewport {
    pub fn new(width: u32) -> Self {
        Self {
            inner: Arc::new(ViewportInner {
                width: AtomicU32::new(width),
                next_listener_id: AtomicU64::new(0),
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.width.load(Ordering::Acquire)
    }

    pub fn resize(&self, width: u32) {
        self.inner.width.store(width, Ordering::Release);
        let listeners: Vec<ResizeListener> = self.inner.listeners().values().cloned().collect();
        for listener in listeners {
            listener(width);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    /// Registers `listener` until the returned subscription is dropped.
    pub fn add_resize_listener<F>(&self, listener: F) -> ResizeSubscription
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().insert(id, Arc::new(listener));
        ResizeSubscription {
            id,
            viewport: Arc::downgrade(&self.inner),
        }
    }
}

#[must_use = "dropping the subscription removes the listener"]
pub struct ResizeSubscription {
    id: u64,
    viewport: Weak<ViewportInner>,
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        if let Some(viewport) = self.viewport.upgrade() {
            viewport.listeners().remove(&self.id);
        }
    }
}

/// Tracks whether the viewport is mobile-sized while mounted.
pub struct MobileDetector {
    is_mobile: Arc<AtomicBool>,
    _subscription: ResizeSubscription,
}

impl MobileDetector {
    pub fn mount(viewport: &Viewport) -> Self {
        let is_mobile = Arc::new(AtomicBool::new(is_mobile_width(viewport.width())));
        let flag = Arc::clone(&is_mobile);
        let subscription = viewport.add_resize_listener(move |width| {
            let mobile = is_mobile_width(width);
            if flag.swap(mobile, Ordering::AcqRel) != mobile {
                debug!(width, mobile, "viewport crossed mobile breakpoint");
            }
        });
        Self {
            is_mobile,
            _subscription: subscription,
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.is_mobile.load(Ordering::Acquire)
    }
}
