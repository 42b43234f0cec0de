use std::collections::HashMap;

use super::replacer::Replacer;
use crate::typedef::FrameId;

#[derive(Debug)]
struct LruNode {
    is_evictable: bool,
    last_accessed_timestamp: u64,
}

/// Evicts the evictable frame that was accessed least recently.
#[derive(Debug, Default)]
pub(crate) struct LruReplacer {
    node_store: HashMap<FrameId, LruNode>,
    current_timestamp: u64,
}

impl LruReplacer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn evictable_count(&self) -> usize {
        self.node_store.values().filter(|node| node.is_evictable).count()
    }

    fn next_timestamp(&mut self) -> u64 {
        let timestamp = self.current_timestamp;
        self.current_timestamp += 1;
        timestamp
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if let Some(node) = self.node_store.get_mut(&frame_id) {
            node.is_evictable = evictable;
        }
    }
}

impl Replacer for LruReplacer {
    fn evict(&mut self) -> Option<FrameId> {
        let frame_id = self
            .node_store
            .iter()
            .filter(|(_, node)| node.is_evictable)
            .min_by_key(|(_, node)| node.last_accessed_timestamp)
            .map(|(&frame_id, _)| frame_id)?;
        self.remove(frame_id);
        Some(frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.set_evictable(frame_id, false);
    }

    fn unpin(&mut self, frame_id: FrameId) {
        self.set_evictable(frame_id, true);
    }

    fn record_access(&mut self, frame_id: FrameId) {
        let timestamp = self.next_timestamp();
        self.node_store
            .entry(frame_id)
            .and_modify(|node| node.last_accessed_timestamp = timestamp)
            .or_insert(LruNode {
                is_evictable: false,
                last_accessed_timestamp: timestamp,
            });
    }

    fn remove(&mut self, frame_id: FrameId) {
        self.node_store.remove(&frame_id);
    }
}
