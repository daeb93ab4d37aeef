//! Live Bundle Handle

use crate::bundle::ValidatedBundle;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Shared, atomically replaceable reference to the serving bundle.
///
/// Readers clone the inner `Arc` and score against it without holding the lock,
/// so a swap never exposes a half-replaced bundle.
#[derive(Debug, Clone)]
pub struct BundleHandle {
    inner: Arc<RwLock<Arc<ValidatedBundle>>>,
}

impl BundleHandle {
    pub fn new(bundle: ValidatedBundle) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(bundle))),
        }
    }

    /// Bundle serving right now
    pub fn current(&self) -> Arc<ValidatedBundle> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the serving bundle, returning the previous one
    pub fn swap(&self, bundle: ValidatedBundle) -> Arc<ValidatedBundle> {
        let next = Arc::new(bundle);
        let previous = std::mem::replace(&mut *self.inner.write(), Arc::clone(&next));
        info!(
            previous = %previous.bundle_id(),
            current = %next.bundle_id(),
            "Serving bundle swapped"
        );
        previous
    }
}
