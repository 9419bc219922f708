//! Wayland-client integration: binds the dmabuf factory and the optional
//! presentation extension, and routes their events into the buffer manager.

mod handlers;
mod link;

pub use link::WaylandLink;

use anyhow::{Context, Result};
use log::{debug, info};
use wayland_client::globals::registry_queue_init;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, EventQueue};
use wayland_protocols::wp::linux_dmabuf::zv1::client::zwp_linux_dmabuf_v1::ZwpLinuxDmabufV1;
use wayland_protocols::wp::presentation_time::client::wp_presentation::WpPresentation;

use crate::config::ManagerConfig;
use crate::link::WidgetId;
use crate::manager::BufferManager;

/// Versions of zwp_linux_dmabuf_v1 this pipeline speaks. Version 4 moved
/// format discovery to per-surface feedback objects, which the lifecycle
/// core does not consume.
const DMABUF_VERSIONS: std::ops::RangeInclusive<u32> = 1..=3;

/// Protocol state driven by the event queue: the buffer manager plus the
/// few connection-level facts that do not belong to any buffer.
pub struct Session {
    pub manager: BufferManager<WaylandLink>,
    presentation_clock: Option<u32>,
}

impl Session {
    /// Connects to the compositor named by `WAYLAND_DISPLAY`.
    pub fn connect() -> Result<(Self, EventQueue<Self>)> {
        let conn =
            Connection::connect_to_env().context("Failed to connect to Wayland compositor")?;
        debug!("Connected to Wayland display");
        Self::from_connection(conn)
    }

    /// Builds a session on an existing connection, binding globals and
    /// collecting the compositor's initial format advertisements.
    pub fn from_connection(conn: Connection) -> Result<(Self, EventQueue<Self>)> {
        let (globals, mut event_queue) =
            registry_queue_init::<Session>(&conn).context("Failed to initialize Wayland registry")?;
        let qh = event_queue.handle();

        let dmabuf: ZwpLinuxDmabufV1 = globals
            .bind(&qh, DMABUF_VERSIONS, ())
            .context("zwp_linux_dmabuf_v1 not available")?;
        debug!("Bound dmabuf factory");

        let presentation: Option<WpPresentation> = match globals.bind(&qh, 1..=1, ()) {
            Ok(presentation) => {
                debug!("Bound presentation time");
                Some(presentation)
            }
            Err(_) => {
                info!("wp_presentation not advertised; swaps will carry synthetic feedback");
                None
            }
        };

        let link = WaylandLink::new(conn, qh, dmabuf, presentation);
        let config = ManagerConfig {
            presentation_feedback_available: link.presentation_available(),
            ..Default::default()
        };
        let mut session = Session {
            manager: BufferManager::new(link, config),
            presentation_clock: None,
        };

        // Pick up the format/modifier advertisements before the producer
        // can submit anything.
        event_queue
            .roundtrip(&mut session)
            .context("Initial Wayland roundtrip failed")?;
        info!(
            "Compositor advertised {} dmabuf formats",
            session.manager.config().supported_formats.len()
        );

        Ok((session, event_queue))
    }

    /// Makes `widget` a valid swap target backed by `surface`.
    pub fn register_window(&mut self, widget: WidgetId, surface: WlSurface) {
        self.manager.link_mut().register_window(widget, surface);
    }

    /// Forgets a widget. Swaps already attached to its surface still
    /// complete when their compositor events arrive; new attachments fail.
    pub fn unregister_window(&mut self, widget: WidgetId) -> Option<WlSurface> {
        self.manager.link_mut().unregister_window(widget)
    }

    /// Clock the compositor timestamps presentation feedback with, once the
    /// initial roundtrip has delivered it.
    pub fn presentation_clock(&self) -> Option<u32> {
        self.presentation_clock
    }
}
