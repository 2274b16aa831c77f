use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Smallest extent either axis is simulated against.
pub const DEFAULT_MIN_EXTENT: f32 = 200.0;

/// Width and height of the area bodies bounce within.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Substitutes `min_extent` for any axis that is missing, zero or smaller.
    pub fn effective(self, min_extent: f32) -> Self {
        let fix = |v: f32| if v.is_finite() && v >= min_extent { v } else { min_extent };
        Self {
            width: fix(self.width),
            height: fix(self.height),
        }
    }
}

/// Current size of the drawable surface, shared between the host (writer)
/// and the simulator (reader). Either axis may change between ticks.
#[derive(Clone, Debug, Default)]
pub struct SurfaceSize {
    inner: Arc<Extent>,
}

#[derive(Debug, Default)]
struct Extent {
    width: AtomicU32,
    height: AtomicU32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        let size = Self::default();
        size.resize(width, height);
        size
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.inner.width.store(width, Ordering::Relaxed);
        self.inner.height.store(height, Ordering::Relaxed);
    }

    pub fn width(&self) -> u32 {
        self.inner.width.load(Ordering::Relaxed)
    }

    pub fn height(&self) -> u32 {
        self.inner.height.load(Ordering::Relaxed)
    }

    /// Point-in-time bounds. Width and height are read independently.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width() as f32, self.height() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_surface_uses_minimum() {
        let size = SurfaceSize::default();
        let bounds = size.bounds().effective(DEFAULT_MIN_EXTENT);
        assert_eq!(bounds, Bounds::new(200.0, 200.0));
    }

    #[test]
    fn only_small_axis_is_replaced() {
        let bounds = Bounds::new(320.0, 50.0).effective(DEFAULT_MIN_EXTENT);
        assert_eq!(bounds, Bounds::new(320.0, 200.0));
    }

    #[test]
    fn resize_is_visible_through_clones() {
        let size = SurfaceSize::new(10, 10);
        let reader = size.clone();
        size.resize(640, 480);
        assert_eq!(reader.bounds(), Bounds::new(640.0, 480.0));
    }
}
