//! The buffer lifecycle manager.
//!
//! Sits between a producer of dmabuf-backed buffers (typically another
//! process) and the compositor, coordinating three independent event streams
//! that may arrive in any order: buffer-creation completion, frame
//! callbacks, and presentation feedback. Guarantees exactly one completion
//! callback per scheduled swap, even when the buffer is destroyed mid-flight
//! or the compositor discards the frame.
//!
//! Everything here runs on a single cooperative task; operations never
//! block. The asynchrony between a request and the compositor's answer is
//! expressed by storing state on the buffer record rather than waiting.

mod record;
mod registry;
mod validate;

use std::os::fd::OwnedFd;

use log::{debug, info, warn};

use crate::config::{FlushPolicy, ManagerConfig};
use crate::error::{CreateBufferError, DestroyError, SwapError};
use crate::feedback::{PresentationFeedback, SwapResult};
use crate::link::{
    BufferId, CompositorLink, DmabufRequest, FeedbackToken, FrameToken, PlaneLayout, TokenCounter,
    WidgetId,
};
use crate::util::Rect;

use record::BufferRecord;
use registry::BufferRegistry;

/// Producer callback invoked exactly once per accepted swap.
pub type SwapCompletion = Box<dyn FnOnce(SwapResult, PresentationFeedback)>;

/// Client-side buffer lifecycle and presentation pipeline.
///
/// Generic over the [`CompositorLink`] so the full state machine can be
/// exercised against an in-memory link in tests and against real
/// wayland-client proxies in production.
pub struct BufferManager<L: CompositorLink> {
    link: L,
    config: ManagerConfig,
    registry: BufferRegistry<L::Handle>,
    tokens: TokenCounter,
    flush_pending: bool,
}

impl<L: CompositorLink> BufferManager<L> {
    pub fn new(link: L, config: ManagerConfig) -> Self {
        Self {
            link,
            config,
            registry: BufferRegistry::new(),
            tokens: TokenCounter::new(),
            flush_pending: false,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ManagerConfig {
        &mut self.config
    }

    /// Records a dmabuf format advertised by the compositor.
    pub fn add_supported_format(&mut self, format: u32) {
        self.config.supported_formats.insert(format);
    }

    /// Number of buffers currently alive in the registry.
    pub fn live_buffers(&self) -> usize {
        self.registry.len()
    }

    /// Validates an untrusted buffer description and, when it passes, asks
    /// the compositor's dmabuf factory to create the buffer.
    ///
    /// Returns synchronously; the opaque handle arrives later through
    /// [`on_create_complete`](Self::on_create_complete). Swaps may be
    /// scheduled on the id as soon as this returns `Ok`, overlapping the
    /// creation round-trip with the producer's next paint.
    ///
    /// Ownership of `fd` transfers with the call: on rejection it is closed
    /// before returning, on success it travels to the compositor. The caller
    /// must not close it in either case.
    #[allow(clippy::too_many_arguments)]
    pub fn create_buffer(
        &mut self,
        fd: OwnedFd,
        width: u32,
        height: u32,
        strides: &[u32],
        offsets: &[u32],
        format: u32,
        modifiers: &[u64],
        plane_count: u32,
        id: BufferId,
    ) -> Result<(), CreateBufferError> {
        let fd = validate::validate_create(
            fd,
            width,
            height,
            strides,
            offsets,
            format,
            modifiers,
            plane_count,
            id,
            &self.config,
            self.registry.contains(id),
        )?;

        debug!("buffer {id}: creating {width}x{height}, format {format:#010x}, {plane_count} planes");
        self.registry.insert(BufferRecord::new(id, width, height));

        let planes = strides
            .iter()
            .zip(offsets)
            .zip(modifiers)
            .map(|((&stride, &offset), &modifier)| PlaneLayout {
                stride,
                offset,
                modifier,
            })
            .collect();
        self.link.create_dmabuf(DmabufRequest {
            fd,
            id,
            width,
            height,
            format,
            planes,
        });
        self.schedule_flush();
        Ok(())
    }

    /// Schedules a swap of buffer `id` onto `target`.
    ///
    /// An empty `damage` rectangle means the whole buffer changed. The
    /// `completion` callback fires exactly once, when the compositor has
    /// consumed the commit (or the swap is torn down).
    ///
    /// If the buffer's handle has not arrived yet the submission is parked
    /// on the record and attachment happens when creation completes.
    pub fn schedule_swap(
        &mut self,
        target: WidgetId,
        id: BufferId,
        damage: Rect,
        completion: SwapCompletion,
    ) -> Result<(), SwapError> {
        validate::validate_swap(target, id)?;

        let record = self
            .registry
            .get_mut(id)
            .ok_or(SwapError::UnknownId(id))?;

        // A producer normally waits for the completion before reusing the
        // buffer. If it resubmits anyway, finish the superseded swap the
        // same way destroy does, so its completion is not lost.
        let superseded = record.completion.take();
        let stale_frame = record.frame_token.take();
        let stale_feedback = record.feedback_token.take();

        record.target = Some(target);
        record.damage = damage;
        record.completion = Some(completion);
        record.result = None;
        record.feedback = PresentationFeedback::default();
        let ready = record.handle.is_some();

        if let Some(previous) = superseded {
            warn!("buffer {id}: swap scheduled while one is in flight; finishing the earlier swap");
            previous(SwapResult::Acknowledged, PresentationFeedback::now());
        }
        if let Some(token) = stale_frame {
            self.link.release_frame_token(token);
        }
        if let Some(token) = stale_feedback {
            self.link.release_feedback_token(token);
        }

        debug!("buffer {id}: swap scheduled on widget {target} (handle ready: {ready})");
        if ready {
            self.attach_and_commit(id);
        }
        Ok(())
    }

    /// Destroys buffer `id`, releasing its handle and any outstanding event
    /// subscriptions.
    ///
    /// A swap still in flight is finished with an acknowledged result and a
    /// best-effort timestamp: the producer chose to discard the pending
    /// work, and dropping the completion would stall its scheduler.
    pub fn destroy_buffer(&mut self, id: BufferId) -> Result<(), DestroyError> {
        let Some(mut record) = self.registry.remove(id) else {
            return Err(DestroyError::NotFound(id));
        };

        if let Some(completion) = record.completion.take() {
            debug!("buffer {id}: destroyed with a swap in flight; synthesizing its completion");
            completion(SwapResult::Acknowledged, PresentationFeedback::now());
        }
        if let Some(token) = record.frame_token.take() {
            self.link.release_frame_token(token);
        }
        if let Some(token) = record.feedback_token.take() {
            self.link.release_feedback_token(token);
        }
        if let Some(handle) = record.handle.take() {
            self.link.release_handle(handle);
        }

        debug!("buffer {id}: destroyed");
        self.schedule_flush();
        Ok(())
    }

    /// Tears down every live buffer, e.g. when the producer channel resets.
    pub fn reset(&mut self) {
        let records = self.registry.take_all();
        if records.is_empty() {
            return;
        }
        info!("resetting buffer state, dropping {} live buffers", records.len());

        for mut record in records {
            if let Some(completion) = record.completion.take() {
                completion(SwapResult::Acknowledged, PresentationFeedback::now());
            }
            if let Some(token) = record.frame_token.take() {
                self.link.release_frame_token(token);
            }
            if let Some(token) = record.feedback_token.take() {
                self.link.release_feedback_token(token);
            }
            if let Some(handle) = record.handle.take() {
                self.link.release_handle(handle);
            }
        }
        self.schedule_flush();
    }

    /// Continuation of [`create_buffer`](Self::create_buffer): the
    /// compositor finished creating the buffer and handed back its opaque
    /// handle.
    pub fn on_create_complete(&mut self, id: BufferId, handle: L::Handle) {
        if !self.registry.contains(id) {
            // Destroyed while the compositor was still processing the
            // creation request; give the handle straight back.
            debug!("buffer {id}: created after destroy, releasing handle");
            self.link.release_handle(handle);
            return;
        }

        let mut pending_swap = false;
        if let Some(record) = self.registry.get_mut(id) {
            debug!("buffer {id}: compositor handle bound");
            record.handle = Some(handle);
            pending_swap = record.completion.is_some();
        }
        if pending_swap {
            self.attach_and_commit(id);
        }
    }

    /// The compositor rejected the creation request. The record is dropped;
    /// a swap already parked on it is finished as failed.
    pub fn on_create_failed(&mut self, id: BufferId) {
        let Some(mut record) = self.registry.remove(id) else {
            debug!("creation failure for unknown buffer {id}, ignoring");
            return;
        };
        warn!("buffer {id}: compositor failed to create the dmabuf");
        if let Some(completion) = record.completion.take() {
            completion(SwapResult::Failed, PresentationFeedback::default());
        }
    }

    /// A frame callback fired: the compositor consumed the commit carrying
    /// `token`.
    pub fn on_frame_done(&mut self, token: FrameToken) {
        let synthetic_feedback = !self.config.presentation_feedback_available;
        let Some(record) = self.registry.find_by_frame_token(token) else {
            // The buffer was destroyed and the token released; a late event
            // is expected here and must not match anything.
            debug!("frame callback {token} matches no live buffer, dropping");
            return;
        };

        let id = record.id;
        debug!("buffer {id}: frame done");
        record.frame_token = None;
        record.result = Some(SwapResult::Acknowledged);
        if synthetic_feedback {
            // No presentation extension: keep the producer contract uniform
            // by substituting the current monotonic time.
            record.feedback = PresentationFeedback::now();
        }

        self.link.release_frame_token(token);
        self.complete_if_ready(id);
    }

    /// Presentation feedback arrived for the commit carrying `token`.
    ///
    /// Frame callbacks and feedback events are not ordered consistently
    /// across compositors; whichever arrives second triggers the completion.
    pub fn on_feedback_presented(
        &mut self,
        token: FeedbackToken,
        tv_sec_hi: u32,
        tv_sec_lo: u32,
        tv_nsec: u32,
        refresh_ns: u32,
        wire_flags: u32,
    ) {
        let Some(record) = self.registry.find_by_feedback_token(token) else {
            debug!("presentation feedback {token} matches no live buffer, dropping");
            return;
        };

        let id = record.id;
        debug!("buffer {id}: presented");
        record.feedback =
            PresentationFeedback::from_wire(tv_sec_hi, tv_sec_lo, tv_nsec, refresh_ns, wire_flags);
        record.feedback_token = None;

        self.link.release_feedback_token(token);
        self.complete_if_ready(id);
    }

    /// The compositor discarded the presentation for the commit carrying
    /// `token`. The swap result stays whatever the frame callback reported;
    /// only the feedback is marked as a failure.
    pub fn on_feedback_discarded(&mut self, token: FeedbackToken) {
        let Some(record) = self.registry.find_by_feedback_token(token) else {
            debug!("discarded feedback {token} matches no live buffer, dropping");
            return;
        };

        let id = record.id;
        debug!("buffer {id}: presentation discarded");
        record.feedback = PresentationFeedback::failure();
        record.feedback_token = None;

        self.link.release_feedback_token(token);
        self.complete_if_ready(id);
    }

    /// Issues the flush deferred by [`FlushPolicy::Deferred`], if any. Event
    /// loops call this once at the end of each dispatch batch.
    pub fn flush_if_pending(&mut self) {
        if self.flush_pending {
            self.flush_pending = false;
            self.link.flush();
        }
    }

    /// Emits damage/attach/commit for the swap pending on `id` and arms the
    /// completion subscriptions. Runs exactly once per accepted swap, either
    /// from `schedule_swap` or from the creation continuation.
    fn attach_and_commit(&mut self, id: BufferId) {
        let (target, handle, damage) = {
            let Some(record) = self.registry.get(id) else {
                return;
            };
            match (record.target, record.handle.clone()) {
                (Some(target), Some(handle)) => (target, handle, record.effective_damage()),
                _ => return,
            }
        };

        let Some(surface) = self.link.resolve_target(target) else {
            warn!("buffer {id}: widget {target} has no surface, failing the swap");
            if let Some(record) = self.registry.get_mut(id) {
                record.result = Some(SwapResult::Failed);
            }
            self.complete_if_ready(id);
            return;
        };

        debug!(
            "buffer {id}: damage ({}, {}) {}x{}, attach, commit",
            damage.x, damage.y, damage.width, damage.height
        );
        self.link.damage(&surface, damage);
        self.link.attach(&surface, &handle);

        let frame_token = self.tokens.next_frame();
        self.link.request_frame_callback(&surface, frame_token);

        let feedback_token = if self.config.presentation_feedback_available {
            let token = self.tokens.next_feedback();
            self.link.request_presentation_feedback(&surface, token);
            Some(token)
        } else {
            None
        };

        self.link.commit(&surface);

        if let Some(record) = self.registry.get_mut(id) {
            record.frame_token = Some(frame_token);
            record.feedback_token = feedback_token;
        }
        self.schedule_flush();
    }

    /// Fires the producer completion once both subscriptions have resolved
    /// (or were never armed) and returns the record to idle.
    fn complete_if_ready(&mut self, id: BufferId) {
        let Some(record) = self.registry.get_mut(id) else {
            return;
        };
        if record.awaiting_events() {
            return;
        }
        let Some(completion) = record.completion.take() else {
            return;
        };

        let result = record.result.take().unwrap_or(SwapResult::Acknowledged);
        let feedback = std::mem::take(&mut record.feedback);
        record.damage = Rect::EMPTY;

        debug!("buffer {id}: swap complete, {result:?}");
        completion(result, feedback);
    }

    fn schedule_flush(&mut self) {
        match self.config.flush_policy {
            FlushPolicy::Immediate => self.link.flush(),
            FlushPolicy::Deferred => self.flush_pending = true,
        }
    }
}
