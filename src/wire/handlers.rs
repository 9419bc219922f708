//! Routes compositor events back into the buffer manager: creation
//! completions keyed by buffer id, frame callbacks and presentation feedback
//! keyed by the tokens stored in each proxy's user data.

use log::debug;
use wayland_client::globals::GlobalListContents;
use wayland_client::protocol::{wl_buffer, wl_callback, wl_registry};
use wayland_client::{Connection, Dispatch, QueueHandle, WEnum};
use wayland_protocols::wp::linux_dmabuf::zv1::client::{
    zwp_linux_buffer_params_v1::{self, ZwpLinuxBufferParamsV1},
    zwp_linux_dmabuf_v1,
};
use wayland_protocols::wp::presentation_time::client::{
    wp_presentation, wp_presentation_feedback,
};

use crate::link::{BufferId, FeedbackToken, FrameToken};

use super::Session;

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for Session {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Globals are bound once at connect time; later registry changes
        // only matter for surfaces, which the embedder owns.
        if let wl_registry::Event::Global { interface, .. } = event {
            debug!("late global advertised: {interface}");
        }
    }
}

impl Dispatch<zwp_linux_dmabuf_v1::ZwpLinuxDmabufV1, ()> for Session {
    fn event(
        state: &mut Self,
        _proxy: &zwp_linux_dmabuf_v1::ZwpLinuxDmabufV1,
        event: zwp_linux_dmabuf_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zwp_linux_dmabuf_v1::Event::Format { format } => {
                state.manager.add_supported_format(format);
            }
            zwp_linux_dmabuf_v1::Event::Modifier { format, .. } => {
                state.manager.add_supported_format(format);
            }
            _ => {}
        }
    }
}

impl Dispatch<ZwpLinuxBufferParamsV1, BufferId> for Session {
    fn event(
        state: &mut Self,
        proxy: &ZwpLinuxBufferParamsV1,
        event: zwp_linux_buffer_params_v1::Event,
        data: &BufferId,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zwp_linux_buffer_params_v1::Event::Created { buffer } => {
                proxy.destroy();
                state.manager.on_create_complete(*data, buffer);
            }
            zwp_linux_buffer_params_v1::Event::Failed => {
                proxy.destroy();
                state.manager.on_create_failed(*data);
            }
            _ => {}
        }
    }

    wayland_client::event_created_child!(Session, ZwpLinuxBufferParamsV1, [
        zwp_linux_buffer_params_v1::EVT_CREATED_OPCODE => (wl_buffer::WlBuffer, ()),
    ]);
}

impl Dispatch<wl_buffer::WlBuffer, ()> for Session {
    fn event(
        _state: &mut Self,
        _proxy: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            debug!("buffer released by compositor");
        }
    }
}

impl Dispatch<wl_callback::WlCallback, FrameToken> for Session {
    fn event(
        state: &mut Self,
        _proxy: &wl_callback::WlCallback,
        event: wl_callback::Event,
        data: &FrameToken,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { callback_data } = event {
            debug!("frame callback {data} done at {callback_data}ms");
            state.manager.on_frame_done(*data);
        }
    }
}

impl Dispatch<wp_presentation::WpPresentation, ()> for Session {
    fn event(
        state: &mut Self,
        _proxy: &wp_presentation::WpPresentation,
        event: wp_presentation::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wp_presentation::Event::ClockId { clk_id } = event {
            debug!("presentation clock id: {clk_id}");
            state.presentation_clock = Some(clk_id);
        }
    }
}

impl Dispatch<wp_presentation_feedback::WpPresentationFeedback, FeedbackToken> for Session {
    fn event(
        state: &mut Self,
        _proxy: &wp_presentation_feedback::WpPresentationFeedback,
        event: wp_presentation_feedback::Event,
        data: &FeedbackToken,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wp_presentation_feedback::Event::Presented {
                tv_sec_hi,
                tv_sec_lo,
                tv_nsec,
                refresh,
                flags,
                ..
            } => {
                let raw_flags = match flags {
                    WEnum::Value(kind) => kind.bits(),
                    WEnum::Unknown(raw) => raw,
                };
                state.manager.on_feedback_presented(
                    *data, tv_sec_hi, tv_sec_lo, tv_nsec, refresh, raw_flags,
                );
            }
            wp_presentation_feedback::Event::Discarded => {
                state.manager.on_feedback_discarded(*data);
            }
            wp_presentation_feedback::Event::SyncOutput { .. } => {
                debug!("presentation feedback {data} synced to an output");
            }
            _ => {}
        }
    }
}
