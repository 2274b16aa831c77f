//! Double-buffered frames shared between the scheduler and the render path.
//!
//! The writer fills a private back buffer and swaps it in as the new front.
//! Readers clone the front `Arc` and iterate it without any lock. A reader
//! never observes a half-written frame, though bodies in one frame may have
//! been stepped at different instants relative to the next frame.

use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec2;
use serde::Serialize;

use crate::body::Body;
use crate::color::Rgb;
use crate::EntityId;

/// What the render path needs to know about one body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BodyView {
    pub id: EntityId,
    pub position: Vec2,
    pub color: Rgb,
}

impl From<&Body> for BodyView {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id,
            position: body.position,
            color: body.color,
        }
    }
}

/// Snapshot of all running bodies.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Frame {
    /// Scheduler tick the frame was published on.
    pub tick: u64,
    pub bodies: Vec<BodyView>,
}

impl Frame {
    pub fn contains(&self, id: EntityId) -> bool {
        self.bodies.iter().any(|b| b.id == id)
    }
}

/// Reader side: hands out the last published frame.
#[derive(Clone, Debug, Default)]
pub struct FrameBuffer {
    front: Arc<Mutex<Arc<Frame>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the single writer for this buffer.
    pub fn publisher(&self) -> FramePublisher {
        FramePublisher {
            front: Arc::clone(&self.front),
            back: Frame::default(),
        }
    }

    pub fn latest(&self) -> Arc<Frame> {
        let front = self.front.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*front)
    }
}

/// Writer side: owns the back buffer.
#[derive(Debug)]
pub struct FramePublisher {
    front: Arc<Mutex<Arc<Frame>>>,
    back: Frame,
}

impl FramePublisher {
    /// Fills the back buffer from `bodies` and swaps it to the front.
    pub fn publish<'a, I>(&mut self, tick: u64, bodies: I)
    where
        I: IntoIterator<Item = &'a Body>,
    {
        self.back.tick = tick;
        self.back.bodies.clear();
        self.back.bodies.extend(bodies.into_iter().map(BodyView::from));

        let next = Arc::new(std::mem::take(&mut self.back));
        let previous = {
            let mut front = self.front.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *front, next)
        };

        // Reuse the old front's allocation unless a reader still holds it.
        if let Ok(frame) = Arc::try_unwrap(previous) {
            self.back = frame;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_sees_published_frame() {
        let buffer = FrameBuffer::new();
        let mut publisher = buffer.publisher();
        let bodies = vec![Body::new(1, Vec2::new(5.0, 6.0), Vec2::ONE)];

        publisher.publish(3, &bodies);

        let frame = buffer.latest();
        assert_eq!(frame.tick, 3);
        assert_eq!(frame.bodies.len(), 1);
        assert_eq!(frame.bodies[0].position, Vec2::new(5.0, 6.0));
    }

    #[test]
    fn held_frame_is_not_mutated_by_later_publish() {
        let buffer = FrameBuffer::new();
        let mut publisher = buffer.publisher();
        let a = vec![Body::new(1, Vec2::ZERO, Vec2::ONE)];
        let b = vec![Body::new(2, Vec2::ZERO, Vec2::ONE)];

        publisher.publish(1, &a);
        let held = buffer.latest();
        publisher.publish(2, &b);
        publisher.publish(3, &a);

        assert_eq!(held.tick, 1);
        assert!(held.contains(1));
        assert!(!held.contains(2));
        assert_eq!(buffer.latest().tick, 3);
    }
}
