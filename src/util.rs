//! Small geometry helpers shared across the pipeline.

/// Axis-aligned rectangle used for buffer damage tracking.
///
/// An empty rectangle (zero or negative area) submitted as damage means
/// "the whole buffer changed"; the swap path substitutes the buffer size
/// before talking to the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// The empty rectangle, used as the "full buffer" damage sentinel.
    pub const EMPTY: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Creates a rectangle from its origin and extent.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle covering `width` x `height` pixels at the origin.
    pub fn of_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width.min(i32::MAX as u32) as i32,
            height: height.min(i32::MAX as u32) as i32,
        }
    }

    /// Returns true if the rectangle has a positive area.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns true if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rect_is_not_valid() {
        assert!(Rect::EMPTY.is_empty());
        assert!(!Rect::EMPTY.is_valid());
        assert!(Rect::new(0, 0, 10, 0).is_empty());
        assert!(Rect::new(0, 0, -5, 10).is_empty());
    }

    #[test]
    fn of_size_starts_at_origin() {
        let rect = Rect::of_size(1920, 1080);
        assert_eq!(rect, Rect::new(0, 0, 1920, 1080));
        assert!(rect.is_valid());
    }

    #[test]
    fn of_size_clamps_oversized_dimensions() {
        let rect = Rect::of_size(u32::MAX, 1);
        assert_eq!(rect.width, i32::MAX);
        assert_eq!(rect.height, 1);
    }
}
