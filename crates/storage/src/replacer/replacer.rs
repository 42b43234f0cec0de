use std::fmt::Debug;

use crate::typedef::FrameId;

/// Decides which buffer pool frame gives up its page when the pool is full.
pub trait Replacer: Send + Sync + Debug {
    /// Marks a frame as evictable.
    fn unpin(&mut self, frame_id: FrameId);

    /// Marks a frame as not evictable.
    fn pin(&mut self, frame_id: FrameId);

    /// Records that the frame was accessed now, tracking it (pinned) if it wasn't tracked yet.
    fn record_access(&mut self, frame_id: FrameId);

    /// Picks an evictable frame, stops tracking it and returns it. Returns `None` if no frame is
    /// evictable.
    fn evict(&mut self) -> Option<FrameId>;

    /// Stops tracking a frame, e.g. because its page was dropped from the pool.
    fn remove(&mut self, frame_id: FrameId);
}
