//! Dense multi-channel sample grid used as a channel payload

use crate::payload::Payload;
use std::fmt;

/// Fixed-capacity pixel grid with flat inline storage.
///
/// Dimensions are chosen at construction; `CAP` bounds the live element
/// count `width * height * channels`. Elements are stored plane by plane:
/// element (`x`, `y`) of channel `c` lives at index
/// `c * (height * width) + y * width + x`.
///
/// Storage is inline, so a frame can sit directly in a shared segment.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Frame<T, const CAP: usize> {
    width: u32,
    height: u32,
    channels: u32,
    data: [T; CAP],
}

impl<T: Payload, const CAP: usize> Frame<T, CAP> {
    /// Create a grid with every element zeroed.
    ///
    /// Panics if any dimension is zero or too large for `u32`, or if
    /// `width * height * channels` overflows or exceeds `CAP`.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        assert!(width > 0 && height > 0, "frame dimensions must be positive");
        assert!(channels > 0, "channel count must be positive");
        let elems = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels));
        assert!(
            matches!(elems, Some(n) if n <= CAP),
            "frame of {}x{}x{} exceeds capacity {}",
            width,
            height,
            channels,
            CAP
        );

        // Zero is a valid value for any Payload.
        let mut frame: Self = unsafe { std::mem::zeroed() };
        frame.width = u32::try_from(width).expect("frame width exceeds u32");
        frame.height = u32::try_from(height).expect("frame height exceeds u32");
        frame.channels = u32::try_from(channels).expect("frame channel count exceeds u32");
        frame
    }

    /// Create a grid with every element set to `value`.
    pub fn filled(width: usize, height: usize, channels: usize, value: T) -> Self {
        let mut frame = Self::new(width, height, channels);
        let live = frame.element_count();
        frame.data[..live].fill(value);
        frame
    }

    /// Create a grid from a flat element slice laid out plane by plane.
    ///
    /// Panics if `elems.len()` differs from `width * height * channels`.
    pub fn from_slice(width: usize, height: usize, channels: usize, elems: &[T]) -> Self {
        let mut frame = Self::new(width, height, channels);
        assert_eq!(
            elems.len(),
            frame.element_count(),
            "element count does not match frame dimensions"
        );
        frame.data[..elems.len()].copy_from_slice(elems);
        frame
    }

    /// Grid width in samples
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Grid height in samples
    pub fn height(&self) -> usize {
        self.height as usize
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.channels as usize
    }

    /// Samples per channel plane
    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    fn element_count(&self) -> usize {
        self.pixel_count() * self.channels()
    }

    /// Live elements, plane by plane
    pub fn as_slice(&self) -> &[T] {
        &self.data[..self.element_count()]
    }

    fn index(&self, x: usize, y: usize, channel: usize) -> usize {
        assert!(x < self.width(), "x {} out of bounds (width {})", x, self.width());
        assert!(y < self.height(), "y {} out of bounds (height {})", y, self.height());
        assert!(
            channel < self.channels(),
            "channel {} out of bounds ({} channels)",
            channel,
            self.channels()
        );
        channel * self.pixel_count() + y * self.width() + x
    }

    /// Element at (`x`, `y`) in `channel`.
    ///
    /// Panics if any coordinate is out of bounds.
    pub fn at(&self, x: usize, y: usize, channel: usize) -> T {
        self.data[self.index(x, y, channel)]
    }

    /// Overwrite the element at (`x`, `y`) in `channel`.
    ///
    /// Panics if any coordinate is out of bounds.
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: T) {
        let idx = self.index(x, y, channel);
        self.data[idx] = value;
    }
}

impl<T: Payload, const CAP: usize> Default for Frame<T, CAP> {
    /// The empty grid: zero dimensions, no live elements.
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

/// Structural equality: same width and height, and the same live element
/// sequence. Differing channel counts yield live sequences of different
/// lengths, so they never compare equal.
impl<T: Payload + PartialEq, const CAP: usize> PartialEq for Frame<T, CAP> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.as_slice() == other.as_slice()
    }
}

impl<T: Payload + Eq, const CAP: usize> Eq for Frame<T, CAP> {}

impl<T, const CAP: usize> fmt::Debug for Frame<T, CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

// Flat storage behind fixed-size fields; the all-zero pattern is the empty
// grid.
unsafe impl<T: Payload, const CAP: usize> Payload for Frame<T, CAP> {}

#[cfg(test)]
mod tests {
    use super::*;

    type TestFrame = Frame<u8, { 200 * 200 * 3 }>;

    #[test]
    fn reports_dimensions() {
        for (width, height, channels) in [(100, 100, 1), (100, 100, 3), (200, 200, 1), (200, 200, 3)] {
            let frame = TestFrame::new(width, height, channels);
            assert_eq!(frame.width(), width);
            assert_eq!(frame.height(), height);
            assert_eq!(frame.channels(), channels);
            assert_eq!(frame.pixel_count(), width * height);
            assert_eq!(frame.as_slice().len(), width * height * channels);
        }
    }

    #[test]
    fn new_frame_is_zeroed() {
        let frame = TestFrame::new(100, 100, 3);
        assert!(frame.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn element_round_trip() {
        for (width, height, channels) in [(100, 100, 1), (100, 100, 3), (200, 200, 3)] {
            let mut frame = TestFrame::new(width, height, channels);
            frame.set(width / 2, height / 2, channels - 1, 128);
            assert_eq!(frame.at(width / 2, height / 2, channels - 1), 128);
            assert_eq!(frame.at(0, 0, 0), 0);
        }
    }

    #[test]
    fn index_is_plane_major() {
        let mut frame = Frame::<u8, { 4 * 3 * 2 }>::new(4, 3, 2);
        frame.set(1, 2, 1, 9);
        // channel * (height * width) + row * width + col
        assert_eq!(frame.as_slice()[1 * (3 * 4) + 2 * 4 + 1], 9);
    }

    #[test]
    fn filled_sets_every_element() {
        let frame = TestFrame::filled(100, 100, 3, 255);
        assert!(frame.as_slice().iter().all(|&v| v == 255));
    }

    #[test]
    fn from_slice_preserves_order() {
        let elems: Vec<u8> = (0..24).collect();
        let frame = Frame::<u8, 64>::from_slice(4, 3, 2, &elems);
        assert_eq!(frame.as_slice(), elems.as_slice());
        assert_eq!(frame.at(0, 0, 0), 0);
        assert_eq!(frame.at(3, 2, 1), 23);
    }

    #[test]
    fn equal_frames_compare_equal() {
        let a = TestFrame::filled(100, 100, 3, 255);
        let b = TestFrame::filled(100, 100, 3, 255);
        assert_eq!(a, b);
    }

    #[test]
    fn single_element_difference_breaks_equality() {
        let a = TestFrame::filled(100, 100, 3, 255);
        let mut b = a;
        b.set(99, 99, 2, 254);
        assert_ne!(a, b);
    }

    #[test]
    fn different_channel_counts_are_unequal() {
        let a = TestFrame::filled(100, 100, 1, 7);
        let b = TestFrame::filled(100, 100, 3, 7);
        assert_ne!(a, b);
    }

    #[test]
    fn default_is_empty() {
        let frame = TestFrame::default();
        assert_eq!(frame.width(), 0);
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.channels(), 0);
        assert!(frame.as_slice().is_empty());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_access_panics() {
        let frame = TestFrame::new(100, 100, 3);
        frame.at(100, 0, 0);
    }

    #[test]
    #[should_panic(expected = "channel count must be positive")]
    fn zero_channels_panics() {
        let _ = TestFrame::new(100, 100, 0);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn over_capacity_panics() {
        let _ = Frame::<u8, 16>::new(4, 4, 2);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn dimension_overflow_panics() {
        // The product wraps in release builds if computed naively; the
        // capacity contract must still fire.
        let _ = Frame::<u8, 16>::new(usize::MAX / 2, 4, 2);
    }
}
