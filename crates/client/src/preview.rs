//! Memory-only preview references for not-yet-uploaded files.
//!
//! A [`PreviewHandle`] is not `Clone` and `revoke` consumes it, so the
//! "exactly once" rule is enforced by the type, not by discipline.

use std::collections::HashMap;
use std::sync::Arc;

use domain::PendingFile;
use tracing::warn;

#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
}

#[derive(Default)]
pub struct PreviewHandles {
    next: u64,
    live: HashMap<u64, Arc<[u8]>>,
}

impl PreviewHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, file: &PendingFile) -> PreviewHandle {
        self.next += 1;
        self.live.insert(self.next, Arc::from(file.bytes.as_slice()));
        PreviewHandle { id: self.next }
    }

    /// Bytes for immediate display, as long as the handle is live.
    pub fn resolve(&self, handle: &PreviewHandle) -> Option<Arc<[u8]>> {
        self.live.get(&handle.id).cloned()
    }

    pub fn revoke(&mut self, handle: PreviewHandle) {
        if self.live.remove(&handle.id).is_none() {
            // Unreachable through the public API; worth a trace if it ever fires.
            warn!(id = handle.id, "revoked a preview handle that was not live");
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> PendingFile {
        PendingFile::new("a.png", "image/png", vec![1, 2, 3])
    }

    #[test]
    fn create_resolve_revoke() {
        let mut previews = PreviewHandles::new();
        let handle = previews.create(&file());
        assert_eq!(previews.resolve(&handle).unwrap().as_ref(), &[1, 2, 3]);

        previews.revoke(handle);
        assert_eq!(previews.live_count(), 0);
    }

    #[test]
    fn replacing_a_selection_leaves_one_live_handle() {
        let mut previews = PreviewHandles::new();
        let first = previews.create(&file());
        let _second = previews.create(&file());
        // The owner of the transition revokes the old handle.
        previews.revoke(first);
        assert_eq!(previews.live_count(), 1);
    }
}
