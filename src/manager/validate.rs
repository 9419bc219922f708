//! Validation of untrusted buffer descriptions arriving from the producer
//! process.
//!
//! The descriptor is owned here: it is returned to the caller only when
//! every check passes, and every rejection path drops (closes) it before
//! returning, so a malformed request can never leak an fd.

use std::os::fd::OwnedFd;

use log::warn;
use nix::fcntl::{FcntlArg, fcntl};

use crate::config::ManagerConfig;
use crate::error::{CreateBufferError, SwapError};
use crate::link::{BufferId, WidgetId};

/// Checks a `create_buffer` request field by field, in a fixed order, and
/// hands the descriptor back on success.
#[allow(clippy::too_many_arguments)]
pub(super) fn validate_create(
    fd: OwnedFd,
    width: u32,
    height: u32,
    strides: &[u32],
    offsets: &[u32],
    format: u32,
    modifiers: &[u64],
    plane_count: u32,
    id: BufferId,
    config: &ManagerConfig,
    id_in_use: bool,
) -> Result<OwnedFd, CreateBufferError> {
    if let Err(err) = check_create(
        &fd,
        width,
        height,
        strides,
        offsets,
        format,
        modifiers,
        plane_count,
        id,
        config,
        id_in_use,
    ) {
        warn!("Rejecting buffer {id} from producer: {err}");
        // `fd` drops here, closing the descriptor within this scope.
        return Err(err);
    }
    Ok(fd)
}

#[allow(clippy::too_many_arguments)]
fn check_create(
    fd: &OwnedFd,
    width: u32,
    height: u32,
    strides: &[u32],
    offsets: &[u32],
    format: u32,
    modifiers: &[u64],
    plane_count: u32,
    id: BufferId,
    config: &ManagerConfig,
    id_in_use: bool,
) -> Result<(), CreateBufferError> {
    if fcntl(fd, FcntlArg::F_GETFD).is_err() {
        return Err(CreateBufferError::BadDescriptor);
    }

    if width == 0 || height == 0 {
        return Err(CreateBufferError::BadSize(width, height));
    }

    if plane_count < 1 {
        return Err(CreateBufferError::BadPlaneCount);
    }

    if strides.len() != plane_count as usize
        || offsets.len() != plane_count as usize
        || modifiers.len() != plane_count as usize
    {
        return Err(CreateBufferError::PlaneArrayMismatch {
            strides: strides.len(),
            offsets: offsets.len(),
            modifiers: modifiers.len(),
            planes: plane_count,
        });
    }

    if let Some(plane) = strides.iter().position(|&stride| stride == 0) {
        return Err(CreateBufferError::ZeroStride(plane));
    }

    if !config.supports_format(format) {
        return Err(CreateBufferError::UnsupportedFormat(format));
    }

    if !id.is_valid() {
        return Err(CreateBufferError::BadId(id));
    }

    if id_in_use {
        return Err(CreateBufferError::IdInUse(id));
    }

    Ok(())
}

/// Checks the synchronously verifiable fields of a `schedule_swap` request.
pub(super) fn validate_swap(target: WidgetId, id: BufferId) -> Result<(), SwapError> {
    if target.is_null() {
        return Err(SwapError::BadTarget);
    }
    if !id.is_valid() {
        return Err(SwapError::BadId(id));
    }
    Ok(())
}
