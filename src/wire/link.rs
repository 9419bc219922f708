//! [`CompositorLink`] implementation over real wayland-client proxies.

use std::collections::HashMap;
use std::os::fd::AsFd;

use log::{debug, warn};
use wayland_client::protocol::{wl_buffer::WlBuffer, wl_callback::WlCallback, wl_surface::WlSurface};
use wayland_client::{Connection, QueueHandle};
use wayland_protocols::wp::linux_dmabuf::zv1::client::{
    zwp_linux_buffer_params_v1, zwp_linux_dmabuf_v1::ZwpLinuxDmabufV1,
};
use wayland_protocols::wp::presentation_time::client::{
    wp_presentation::WpPresentation, wp_presentation_feedback::WpPresentationFeedback,
};

use crate::link::{CompositorLink, DmabufRequest, FeedbackToken, FrameToken, WidgetId};
use crate::util::Rect;

use super::Session;

/// Drives the compositor connection on behalf of the buffer manager.
///
/// Owns the widget-to-surface map and the proxies backing outstanding
/// frame-callback and presentation-feedback subscriptions, keyed by the
/// tokens the core issued for them. Releasing a token drops its proxy, so a
/// late event can only ever reach the dispatcher with a token the manager
/// no longer matches.
pub struct WaylandLink {
    conn: Connection,
    qh: QueueHandle<Session>,
    dmabuf: ZwpLinuxDmabufV1,
    presentation: Option<WpPresentation>,
    windows: HashMap<WidgetId, WlSurface>,
    frame_callbacks: HashMap<FrameToken, WlCallback>,
    feedbacks: HashMap<FeedbackToken, WpPresentationFeedback>,
}

impl WaylandLink {
    pub(super) fn new(
        conn: Connection,
        qh: QueueHandle<Session>,
        dmabuf: ZwpLinuxDmabufV1,
        presentation: Option<WpPresentation>,
    ) -> Self {
        Self {
            conn,
            qh,
            dmabuf,
            presentation,
            windows: HashMap::new(),
            frame_callbacks: HashMap::new(),
            feedbacks: HashMap::new(),
        }
    }

    /// Makes `widget` resolvable to `surface` for swap targeting.
    pub fn register_window(&mut self, widget: WidgetId, surface: WlSurface) {
        debug!("widget {widget} registered");
        self.windows.insert(widget, surface);
    }

    /// Forgets a widget; swaps targeting it will fail their attachment.
    pub fn unregister_window(&mut self, widget: WidgetId) -> Option<WlSurface> {
        debug!("widget {widget} unregistered");
        self.windows.remove(&widget)
    }

    pub fn presentation_available(&self) -> bool {
        self.presentation.is_some()
    }
}

impl CompositorLink for WaylandLink {
    type Handle = WlBuffer;
    type Surface = WlSurface;

    fn resolve_target(&self, target: WidgetId) -> Option<WlSurface> {
        self.windows.get(&target).cloned()
    }

    fn create_dmabuf(&mut self, request: DmabufRequest) {
        let params = self.dmabuf.create_params(&self.qh, request.id);
        for (index, plane) in request.planes.iter().enumerate() {
            params.add(
                request.fd.as_fd(),
                index as u32,
                plane.offset,
                plane.stride,
                (plane.modifier >> 32) as u32,
                plane.modifier as u32,
            );
        }
        params.create(
            request.width as i32,
            request.height as i32,
            request.format,
            zwp_linux_buffer_params_v1::Flags::empty(),
        );
        // `request.fd` drops here; the backend duplicated it while
        // marshalling the add requests, so this close is the hand-off.
    }

    fn attach(&mut self, surface: &WlSurface, handle: &WlBuffer) {
        surface.attach(Some(handle), 0, 0);
    }

    fn damage(&mut self, surface: &WlSurface, region: Rect) {
        surface.damage_buffer(region.x, region.y, region.width, region.height);
    }

    fn request_frame_callback(&mut self, surface: &WlSurface, token: FrameToken) {
        let callback = surface.frame(&self.qh, token);
        self.frame_callbacks.insert(token, callback);
    }

    fn request_presentation_feedback(&mut self, surface: &WlSurface, token: FeedbackToken) {
        let Some(presentation) = &self.presentation else {
            // The manager only arms feedback when the extension is
            // available, so this is a configuration mismatch.
            warn!("presentation feedback requested without wp_presentation");
            return;
        };
        let feedback = presentation.feedback(surface, &self.qh, token);
        self.feedbacks.insert(token, feedback);
    }

    fn commit(&mut self, surface: &WlSurface) {
        surface.commit();
    }

    fn release_handle(&mut self, handle: WlBuffer) {
        handle.destroy();
    }

    fn release_frame_token(&mut self, token: FrameToken) {
        // wl_callback has no destructor request; dropping the proxy is
        // enough once nothing will match its token anymore.
        self.frame_callbacks.remove(&token);
    }

    fn release_feedback_token(&mut self, token: FeedbackToken) {
        self.feedbacks.remove(&token);
    }

    fn flush(&mut self) {
        if let Err(err) = self.conn.flush() {
            warn!("Failed to flush Wayland connection: {err}");
        }
    }
}
