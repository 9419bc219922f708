//! Shared in-memory compositor link for pipeline tests.

use std::collections::HashSet;
use std::os::fd::OwnedFd;

use wayswap::{
    CompositorLink, DmabufRequest, FeedbackToken, FrameToken, Rect, WidgetId,
};

/// One request verb emitted towards the (fake) compositor, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOp {
    CreateDmabuf {
        id: wayswap::BufferId,
        width: u32,
        height: u32,
        format: u32,
        planes: usize,
    },
    Damage {
        surface: u32,
        region: Rect,
    },
    Attach {
        surface: u32,
        handle: u64,
    },
    FrameRequest {
        surface: u32,
        token: FrameToken,
    },
    FeedbackRequest {
        surface: u32,
        token: FeedbackToken,
    },
    Commit {
        surface: u32,
    },
    ReleaseHandle(u64),
    ReleaseFrameToken(FrameToken),
    ReleaseFeedbackToken(FeedbackToken),
    Flush,
}

/// Records every emission so tests can assert on order and content. Holds
/// on to transferred descriptors the way the real compositor side would.
#[derive(Debug, Default)]
pub struct FakeLink {
    pub ops: Vec<WireOp>,
    pub surfaces: HashSet<WidgetId>,
    pub received_fds: Vec<OwnedFd>,
}

impl FakeLink {
    pub fn with_surfaces(widgets: impl IntoIterator<Item = WidgetId>) -> Self {
        Self {
            surfaces: widgets.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Drains the recorded emissions.
    pub fn take_ops(&mut self) -> Vec<WireOp> {
        std::mem::take(&mut self.ops)
    }
}

impl CompositorLink for FakeLink {
    type Handle = u64;
    type Surface = u32;

    fn resolve_target(&self, target: WidgetId) -> Option<u32> {
        self.surfaces.contains(&target).then_some(target.0)
    }

    fn create_dmabuf(&mut self, request: DmabufRequest) {
        self.ops.push(WireOp::CreateDmabuf {
            id: request.id,
            width: request.width,
            height: request.height,
            format: request.format,
            planes: request.planes.len(),
        });
        self.received_fds.push(request.fd);
    }

    fn attach(&mut self, surface: &u32, handle: &u64) {
        self.ops.push(WireOp::Attach {
            surface: *surface,
            handle: *handle,
        });
    }

    fn damage(&mut self, surface: &u32, region: Rect) {
        self.ops.push(WireOp::Damage {
            surface: *surface,
            region,
        });
    }

    fn request_frame_callback(&mut self, surface: &u32, token: FrameToken) {
        self.ops.push(WireOp::FrameRequest {
            surface: *surface,
            token,
        });
    }

    fn request_presentation_feedback(&mut self, surface: &u32, token: FeedbackToken) {
        self.ops.push(WireOp::FeedbackRequest {
            surface: *surface,
            token,
        });
    }

    fn commit(&mut self, surface: &u32) {
        self.ops.push(WireOp::Commit { surface: *surface });
    }

    fn release_handle(&mut self, handle: u64) {
        self.ops.push(WireOp::ReleaseHandle(handle));
    }

    fn release_frame_token(&mut self, token: FrameToken) {
        self.ops.push(WireOp::ReleaseFrameToken(token));
    }

    fn release_feedback_token(&mut self, token: FeedbackToken) {
        self.ops.push(WireOp::ReleaseFeedbackToken(token));
    }

    fn flush(&mut self) {
        self.ops.push(WireOp::Flush);
    }
}
