//! Registry of in-flight buffer records, keyed by producer-assigned id.

use std::collections::HashMap;

use crate::link::{BufferId, FeedbackToken, FrameToken};

use super::record::BufferRecord;

/// Owns every live [`BufferRecord`].
///
/// Token lookups walk the map instead of keeping a second token-keyed index:
/// the working set is bounded by the swapchain depth (a handful of buffers),
/// and one map cannot desynchronize from itself on teardown.
pub(super) struct BufferRegistry<H> {
    buffers: HashMap<u32, BufferRecord<H>>,
}

impl<H> BufferRegistry<H> {
    pub(super) fn new() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }

    pub(super) fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id.0)
    }

    /// Inserts a record; returns false (leaving the registry untouched) if
    /// the id is already occupied.
    pub(super) fn insert(&mut self, record: BufferRecord<H>) -> bool {
        if self.contains(record.id) {
            return false;
        }
        self.buffers.insert(record.id.0, record);
        true
    }

    pub(super) fn get(&self, id: BufferId) -> Option<&BufferRecord<H>> {
        self.buffers.get(&id.0)
    }

    pub(super) fn get_mut(&mut self, id: BufferId) -> Option<&mut BufferRecord<H>> {
        self.buffers.get_mut(&id.0)
    }

    pub(super) fn remove(&mut self, id: BufferId) -> Option<BufferRecord<H>> {
        self.buffers.remove(&id.0)
    }

    pub(super) fn find_by_frame_token(
        &mut self,
        token: FrameToken,
    ) -> Option<&mut BufferRecord<H>> {
        self.buffers
            .values_mut()
            .find(|record| record.frame_token == Some(token))
    }

    pub(super) fn find_by_feedback_token(
        &mut self,
        token: FeedbackToken,
    ) -> Option<&mut BufferRecord<H>> {
        self.buffers
            .values_mut()
            .find(|record| record.feedback_token == Some(token))
    }

    /// Removes and returns every record, e.g. on connection reset.
    pub(super) fn take_all(&mut self) -> Vec<BufferRecord<H>> {
        self.buffers.drain().map(|(_, record)| record).collect()
    }

    pub(super) fn len(&self) -> usize {
        self.buffers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::TokenCounter;

    fn record(id: u32) -> BufferRecord<u64> {
        BufferRecord::new(BufferId(id), 64, 64)
    }

    #[test]
    fn insert_rejects_occupied_ids() {
        let mut registry = BufferRegistry::new();
        assert!(registry.insert(record(1)));
        assert!(!registry.insert(record(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_frees_the_id_for_reuse() {
        let mut registry = BufferRegistry::new();
        assert!(registry.insert(record(5)));
        assert!(registry.remove(BufferId(5)).is_some());
        assert!(registry.remove(BufferId(5)).is_none());
        assert!(registry.insert(record(5)));
    }

    #[test]
    fn token_lookup_finds_the_holding_record() {
        let mut counter = TokenCounter::new();
        let frame = counter.next_frame();
        let feedback = counter.next_feedback();

        let mut registry = BufferRegistry::new();
        let mut with_tokens = record(1);
        with_tokens.frame_token = Some(frame);
        with_tokens.feedback_token = Some(feedback);
        registry.insert(with_tokens);
        registry.insert(record(2));

        assert_eq!(
            registry.find_by_frame_token(frame).map(|r| r.id),
            Some(BufferId(1))
        );
        assert_eq!(
            registry.find_by_feedback_token(feedback).map(|r| r.id),
            Some(BufferId(1))
        );
        assert!(
            registry
                .find_by_frame_token(counter.next_frame())
                .is_none()
        );
    }

    #[test]
    fn take_all_drains_the_registry() {
        let mut registry = BufferRegistry::new();
        registry.insert(record(1));
        registry.insert(record(2));

        let drained = registry.take_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(registry.len(), 0);
    }
}
