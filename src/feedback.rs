//! Swap outcomes and presentation feedback reported back to the producer.
//!
//! Every accepted swap eventually produces exactly one `(SwapResult,
//! PresentationFeedback)` pair. The feedback is always a plain value, never
//! an optional: when the compositor does not support presentation feedback a
//! synthetic reading of the monotonic clock is substituted, and a discarded
//! presentation is reported as a feedback carrying the failure flag.

use std::time::Duration;

use bitflags::bitflags;
use nix::time::{ClockId, clock_gettime};

/// Outcome of a scheduled buffer swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapResult {
    /// The compositor consumed the commit.
    Acknowledged,
    /// The swap could not be carried out (e.g. the target surface vanished).
    Failed,
}

bitflags! {
    /// Portable presentation-feedback flags, translated from the wire bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PresentationFlags: u32 {
        /// Presentation was synchronized to the vertical retrace.
        const V_SYNC = 1 << 0;
        /// The timestamp was provided by a hardware clock.
        const HW_CLOCK = 1 << 1;
        /// Display hardware signalled the completion event.
        const HW_COMPLETION = 1 << 2;
        /// The buffer was scanned out directly, without a copy.
        const ZERO_COPY = 1 << 3;
        /// The presentation was discarded; the other fields are meaningless.
        const FAILURE = 1 << 31;
    }
}

// Flag bits of wp_presentation_feedback.kind, fixed by the presentation-time
// protocol.
const WIRE_VSYNC: u32 = 0x1;
const WIRE_HW_CLOCK: u32 = 0x2;
const WIRE_HW_COMPLETION: u32 = 0x4;
const WIRE_ZERO_COPY: u32 = 0x8;

/// Translates raw `wp_presentation_feedback.kind` bits to the portable set.
pub fn translate_wire_flags(raw: u32) -> PresentationFlags {
    let mut flags = PresentationFlags::empty();
    if raw & WIRE_VSYNC != 0 {
        flags |= PresentationFlags::V_SYNC;
    }
    if raw & WIRE_HW_CLOCK != 0 {
        flags |= PresentationFlags::HW_CLOCK;
    }
    if raw & WIRE_HW_COMPLETION != 0 {
        flags |= PresentationFlags::HW_COMPLETION;
    }
    if raw & WIRE_ZERO_COPY != 0 {
        flags |= PresentationFlags::ZERO_COPY;
    }
    flags
}

/// Reads the monotonic clock, as a duration since the unspecified epoch the
/// compositor's presentation timestamps use.
pub fn monotonic_now() -> Duration {
    clock_gettime(ClockId::CLOCK_MONOTONIC)
        .map(|ts| Duration::new(ts.tv_sec() as u64, ts.tv_nsec() as u32))
        .unwrap_or_default()
}

/// When and how a swap reached the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentationFeedback {
    /// Monotonic presentation time; zero when unknown.
    pub timestamp: Duration,
    /// Refresh interval of the output the buffer was presented on; zero when
    /// unknown or when the output does not refresh at a fixed rate.
    pub refresh: Duration,
    pub flags: PresentationFlags,
}

impl PresentationFeedback {
    pub fn new(timestamp: Duration, refresh: Duration, flags: PresentationFlags) -> Self {
        Self {
            timestamp,
            refresh,
            flags,
        }
    }

    /// Best-effort feedback carrying the current monotonic time, used when
    /// the compositor provides no presentation extension or when a pending
    /// swap is finished synthetically.
    pub fn now() -> Self {
        Self {
            timestamp: monotonic_now(),
            refresh: Duration::ZERO,
            flags: PresentationFlags::empty(),
        }
    }

    /// Feedback for a presentation the compositor discarded.
    pub fn failure() -> Self {
        Self {
            timestamp: Duration::ZERO,
            refresh: Duration::ZERO,
            flags: PresentationFlags::FAILURE,
        }
    }

    /// Reconstructs feedback from the fields of a
    /// `wp_presentation_feedback.presented` event. The seconds value is split
    /// across two words on the wire to survive 32-bit clients.
    pub fn from_wire(
        tv_sec_hi: u32,
        tv_sec_lo: u32,
        tv_nsec: u32,
        refresh_ns: u32,
        wire_flags: u32,
    ) -> Self {
        let seconds = ((tv_sec_hi as u64) << 32) | tv_sec_lo as u64;
        Self::new(
            Duration::new(seconds, tv_nsec),
            Duration::from_nanos(refresh_ns as u64),
            translate_wire_flags(wire_flags),
        )
    }

    pub fn is_failure(&self) -> bool {
        self.flags.contains(PresentationFlags::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_flags_translate_to_portable_set() {
        assert_eq!(translate_wire_flags(0), PresentationFlags::empty());
        assert_eq!(
            translate_wire_flags(WIRE_VSYNC | WIRE_HW_CLOCK),
            PresentationFlags::V_SYNC | PresentationFlags::HW_CLOCK
        );
        assert_eq!(
            translate_wire_flags(WIRE_HW_COMPLETION | WIRE_ZERO_COPY),
            PresentationFlags::HW_COMPLETION | PresentationFlags::ZERO_COPY
        );
        // Unknown wire bits are dropped rather than forwarded.
        assert_eq!(translate_wire_flags(0x8000_0000), PresentationFlags::empty());
    }

    #[test]
    fn from_wire_reassembles_split_seconds() {
        let feedback = PresentationFeedback::from_wire(1, 10, 500_000_000, 16_666_667, WIRE_VSYNC);
        assert_eq!(
            feedback,
            PresentationFeedback::new(
                Duration::new((1u64 << 32) + 10, 500_000_000),
                Duration::from_nanos(16_666_667),
                PresentationFlags::V_SYNC,
            )
        );
        assert!(!feedback.is_failure());
    }

    #[test]
    fn failure_feedback_is_flagged() {
        let feedback = PresentationFeedback::failure();
        assert!(feedback.is_failure());
        assert_eq!(feedback.timestamp, Duration::ZERO);
        assert_eq!(feedback.refresh, Duration::ZERO);
    }

    #[test]
    fn now_reads_a_monotonic_timestamp() {
        let before = monotonic_now();
        let feedback = PresentationFeedback::now();
        let after = monotonic_now();
        assert!(feedback.timestamp >= before);
        assert!(feedback.timestamp <= after);
        assert_eq!(feedback.refresh, Duration::ZERO);
        assert!(feedback.flags.is_empty());
    }
}
