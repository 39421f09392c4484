use std::sync::Arc;

use arc_swap::ArcSwap;

use super::Options;

/// Process-wide configuration snapshot.
///
/// Readers get a complete `Options` value without taking a lock; writers
/// replace the whole value in a single atomic swap.
pub struct OptionsSnapshot {
    current: ArcSwap<Options>,
}

impl OptionsSnapshot {
    pub fn new(opts: Options) -> Self {
        Self {
            current: ArcSwap::from_pointee(opts),
        }
    }

    /// Returns the snapshot that is current right now.
    pub fn load(&self) -> Arc<Options> {
        self.current.load_full()
    }

    /// Publishes `opts` as the new snapshot.
    pub fn store(
        &self,
        opts: Options,
    ) {
        self.current.store(Arc::new(opts));
    }
}

impl std::fmt::Debug for OptionsSnapshot {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("OptionsSnapshot")
            .field("current", &self.load())
            .finish()
    }
}
