//! Per-buffer bookkeeping for the lifecycle core.

use crate::feedback::{PresentationFeedback, SwapResult};
use crate::link::{BufferId, FeedbackToken, FrameToken, WidgetId};
use crate::util::Rect;

use super::SwapCompletion;

/// One live buffer, from creation until destruction.
///
/// The swap in flight (if any) is described by `completion` plus the two
/// token slots: a populated token slot means the matching compositor event
/// is still outstanding. Holding the token inside the record keeps every
/// outstanding token owned by exactly one record.
pub(super) struct BufferRecord<H> {
    pub(super) id: BufferId,
    pub(super) width: u32,
    pub(super) height: u32,

    /// Opaque compositor handle; set once the compositor acknowledges
    /// creation, cleared (and released) on destroy.
    pub(super) handle: Option<H>,

    /// Swap target, set on first submission.
    pub(super) target: Option<WidgetId>,

    /// Damage of the pending swap; empty means "full buffer".
    pub(super) damage: Rect,

    /// Producer callback; present exactly while a swap is in flight.
    pub(super) completion: Option<SwapCompletion>,

    pub(super) frame_token: Option<FrameToken>,
    pub(super) feedback_token: Option<FeedbackToken>,

    /// Provisional swap outcome, set by the frame callback or by an
    /// attachment failure.
    pub(super) result: Option<SwapResult>,
    pub(super) feedback: PresentationFeedback,
}

impl<H> BufferRecord<H> {
    pub(super) fn new(id: BufferId, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            handle: None,
            target: None,
            damage: Rect::EMPTY,
            completion: None,
            frame_token: None,
            feedback_token: None,
            result: None,
            feedback: PresentationFeedback::default(),
        }
    }

    /// True while at least one compositor event is still outstanding for the
    /// swap in flight.
    pub(super) fn awaiting_events(&self) -> bool {
        self.frame_token.is_some() || self.feedback_token.is_some()
    }

    /// The damage rectangle to send with the next commit; an empty pending
    /// damage stands for the whole buffer.
    pub(super) fn effective_damage(&self) -> Rect {
        if self.damage.is_valid() {
            self.damage
        } else {
            Rect::of_size(self.width, self.height)
        }
    }
}
