use serde::Serialize;

use crate::color::{Rgba, BACKGROUND, OUTLINE};
use crate::frame::FrameBuffer;
use crate::surface::SurfaceSize;

/// Ball radius in pixels.
pub const DEFAULT_RADIUS: f32 = 14.0;

/// Drawing target for the render surface.
pub trait Canvas {
    fn clear(&mut self, width: u32, height: u32, color: Rgba);

    /// Fills the ellipse inscribed in the box at `(x, y)` of size `w` x `h`.
    fn fill_ellipse(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba);

    fn stroke_ellipse(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba);
}

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear { width: u32, height: u32, color: Rgba },
    FillEllipse { x: i32, y: i32, w: i32, h: i32, color: Rgba },
    StrokeEllipse { x: i32, y: i32, w: i32, h: i32, color: Rgba },
}

/// Canvas that records its calls so a frame can be serialized and shipped.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn reset(&mut self) {
        self.commands.clear();
    }
}

impl Canvas for DrawList {
    fn clear(&mut self, width: u32, height: u32, color: Rgba) {
        self.commands.push(DrawCommand::Clear { width, height, color });
    }

    fn fill_ellipse(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        self.commands.push(DrawCommand::FillEllipse { x, y, w, h, color });
    }

    fn stroke_ellipse(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        self.commands.push(DrawCommand::StrokeEllipse { x, y, w, h, color });
    }
}

/// What one call to [`RenderSurface::render`] drew.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// Scheduler tick of the drawn frame.
    pub tick: u64,
    pub bodies: usize,
}

/// Owns the drawable size and draws the latest published frame on demand.
#[derive(Clone, Debug)]
pub struct RenderSurface {
    size: SurfaceSize,
    frames: FrameBuffer,
    radius: f32,
}

impl RenderSurface {
    pub fn new(size: SurfaceSize, frames: FrameBuffer, radius: f32) -> Self {
        Self { size, frames, radius }
    }

    pub fn size(&self) -> &SurfaceSize {
        &self.size
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Draws every body of the latest frame.
    ///
    /// Only the frame pointer is taken under a lock; drawing works on the
    /// immutable snapshot.
    pub fn render(&self, canvas: &mut dyn Canvas) -> Rendered {
        let frame = self.frames.latest();
        canvas.clear(self.size.width(), self.size.height(), BACKGROUND.into());

        let r = self.radius.round() as i32;
        for body in &frame.bodies {
            let x = body.position.x.round() as i32 - r;
            let y = body.position.y.round() as i32 - r;
            canvas.fill_ellipse(x, y, r * 2, r * 2, body.color.into());
            canvas.stroke_ellipse(x, y, r * 2, r * 2, OUTLINE);
        }
        Rendered {
            tick: frame.tick,
            bodies: frame.bodies.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, SpawnRegion};
    use crate::color::Rgb;
    use crate::registry::Registry;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draws_filled_circle_and_outline_per_body() {
        let frames = FrameBuffer::new();
        let mut publisher = frames.publisher();
        publisher.publish(1, &[Body::new(5, Vec2::new(100.4, 50.6), Vec2::ONE)]);
        let surface = RenderSurface::new(SurfaceSize::new(320, 200), frames, DEFAULT_RADIUS);

        let mut list = DrawList::new();
        assert_eq!(surface.render(&mut list), Rendered { tick: 1, bodies: 1 });

        assert_eq!(
            list.commands,
            vec![
                DrawCommand::Clear { width: 320, height: 200, color: BACKGROUND.into() },
                DrawCommand::FillEllipse { x: 86, y: 37, w: 28, h: 28, color: Rgb::from_id(5).into() },
                DrawCommand::StrokeEllipse { x: 86, y: 37, w: 28, h: 28, color: OUTLINE },
            ]
        );
    }

    #[test]
    fn removed_body_is_never_drawn() {
        let frames = FrameBuffer::new();
        let mut registry =
            Registry::with_rng(SpawnRegion::default(), &frames, StdRng::seed_from_u64(1));
        let surface = RenderSurface::new(SurfaceSize::new(320, 200), frames, DEFAULT_RADIUS);
        registry.reconcile([1, 2, 3]);
        registry.finish_tick();

        registry.remove_one(2);

        let mut list = DrawList::new();
        assert_eq!(surface.render(&mut list).bodies, 2);
        let hidden: Rgba = Rgb::from_id(2).into();
        assert!(!list.commands.iter().any(|c| matches!(
            c,
            DrawCommand::FillEllipse { color, .. } if *color == hidden
        )));
    }

    #[test]
    fn empty_frame_only_clears() {
        let surface = RenderSurface::new(SurfaceSize::default(), FrameBuffer::new(), DEFAULT_RADIUS);
        let mut list = DrawList::new();
        assert_eq!(surface.render(&mut list).bodies, 0);
        assert_eq!(list.len(), 1);
    }
}
