//! Types crossing the seam between the lifecycle core and the compositor
//! connection.
//!
//! The core never talks to the display protocol directly; it drives a
//! [`CompositorLink`], which the `wire` module implements over real
//! wayland-client proxies and tests implement with an in-memory fake.

use std::fmt;
use std::os::fd::OwnedFd;

use crate::util::Rect;

/// Producer-assigned buffer identifier. Zero is reserved and never valid;
/// ids must be unique while a buffer with that id is alive, and may be
/// reused after it has been destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl BufferId {
    pub const fn is_valid(self) -> bool {
        self.0 >= 1
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the widget a swap targets; resolved to a concrete surface by
/// the link. Zero is the null widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub u32);

impl WidgetId {
    pub const NULL: WidgetId = WidgetId(0);

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an outstanding frame-callback subscription.
///
/// Tokens are issued by the core and never reused, so a late event carrying
/// a released token can never match a record whose id was recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

impl fmt::Display for FrameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an outstanding presentation-feedback subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackToken(u64);

impl fmt::Display for FeedbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues unique tokens for both subscription kinds from one counter.
#[derive(Debug)]
pub struct TokenCounter {
    next: u64,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.next);
        self.next += 1;
        token
    }

    pub fn next_feedback(&mut self) -> FeedbackToken {
        let token = FeedbackToken(self.next);
        self.next += 1;
        token
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-plane layout of a dmabuf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub stride: u32,
    pub offset: u32,
    pub modifier: u64,
}

/// A validated buffer-creation request, ready to hand to the compositor's
/// dmabuf factory. Owns the descriptor; dropping the request closes it,
/// which is correct once the protocol layer has duplicated it for the wire.
#[derive(Debug)]
pub struct DmabufRequest {
    pub fd: OwnedFd,
    pub id: BufferId,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub planes: Vec<PlaneLayout>,
}

/// The compositor-facing wire surface the lifecycle core drives.
///
/// Implementations emit the request verbs of the underlying display protocol
/// and own whatever proxies back the opaque handles, surfaces, and
/// subscription tokens. All calls are non-blocking; responses come back
/// through the manager's event entry points.
pub trait CompositorLink {
    /// Opaque compositor buffer handle (`wl_buffer` on the wire). Cloning
    /// must be cheap; handles are released exactly once via
    /// [`CompositorLink::release_handle`].
    type Handle: Clone;

    /// A resolved swap target (`wl_surface` on the wire).
    type Surface;

    /// Resolves a widget to its surface, or `None` if the widget no longer
    /// has one.
    fn resolve_target(&self, target: WidgetId) -> Option<Self::Surface>;

    /// Asks the compositor's dmabuf factory to create a buffer. The matching
    /// completion arrives later as `on_create_complete` or
    /// `on_create_failed`, keyed by the request's buffer id.
    fn create_dmabuf(&mut self, request: DmabufRequest);

    fn attach(&mut self, surface: &Self::Surface, handle: &Self::Handle);

    fn damage(&mut self, surface: &Self::Surface, region: Rect);

    /// Subscribes to the next frame callback on `surface`; the compositor's
    /// answer is routed back with `token`.
    fn request_frame_callback(&mut self, surface: &Self::Surface, token: FrameToken);

    /// Subscribes to presentation feedback for the next commit on `surface`.
    /// Only called when the presentation extension is available.
    fn request_presentation_feedback(&mut self, surface: &Self::Surface, token: FeedbackToken);

    fn commit(&mut self, surface: &Self::Surface);

    /// Releases an opaque buffer handle back to the compositor.
    fn release_handle(&mut self, handle: Self::Handle);

    /// Drops an outstanding frame-callback subscription so a late event
    /// finds no match.
    fn release_frame_token(&mut self, token: FrameToken);

    /// Drops an outstanding presentation-feedback subscription.
    fn release_feedback_token(&mut self, token: FeedbackToken);

    /// Flushes buffered requests to the compositor.
    fn flush(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ids_are_reserved() {
        assert!(!BufferId(0).is_valid());
        assert!(BufferId(1).is_valid());
        assert!(WidgetId(0).is_null());
        assert!(!WidgetId(7).is_null());
        assert_eq!(WidgetId::NULL, WidgetId(0));
    }

    #[test]
    fn token_counter_never_repeats_across_kinds() {
        let mut counter = TokenCounter::new();
        let frame_a = counter.next_frame();
        let feedback = counter.next_feedback();
        let frame_b = counter.next_frame();
        assert_ne!(frame_a, frame_b);
        assert_ne!(format!("{frame_a}"), format!("{feedback}"));
        assert_ne!(format!("{frame_b}"), format!("{feedback}"));
    }
}
