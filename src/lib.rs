//! Client-side dmabuf buffer lifecycle and presentation pipeline for
//! Wayland compositors.
//!
//! A producer (typically a GPU process) hands over dmabuf-backed buffers by
//! file descriptor; this crate validates them, asks the compositor to turn
//! them into attachable buffers, and drives the attach/damage/commit cycle
//! for scheduled swaps while correlating frame callbacks and presentation
//! feedback back to exactly one completion per swap - regardless of the
//! order those events arrive in, and even when a buffer is destroyed with a
//! swap still in flight.
//!
//! The lifecycle core ([`BufferManager`]) is generic over a
//! [`CompositorLink`]; the [`wire`] module provides the real link over
//! wayland-client proxies.

pub mod config;
pub mod error;
pub mod feedback;
pub mod link;
pub mod manager;
pub mod util;
pub mod wire;

pub use config::{FileConfig, FlushPolicy, ManagerConfig};
pub use error::{CreateBufferError, DestroyError, SwapError};
pub use feedback::{PresentationFeedback, PresentationFlags, SwapResult};
pub use link::{
    BufferId, CompositorLink, DmabufRequest, FeedbackToken, FrameToken, PlaneLayout, WidgetId,
};
pub use manager::{BufferManager, SwapCompletion};
pub use util::Rect;
