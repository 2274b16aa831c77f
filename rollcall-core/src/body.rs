use std::ops::Range;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::EntityId;

/// Lifecycle of a body. A stopped body never resumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyState {
    Running,
    Stopped,
}

/// Simulated state of one animated entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Rgb,
    state: BodyState,
}

impl Body {
    /// Creates a running body with the colour derived from `id`.
    pub fn new(id: EntityId, position: Vec2, velocity: Vec2) -> Self {
        Self {
            id,
            position,
            velocity,
            color: Rgb::from_id(id),
            state: BodyState::Running,
        }
    }

    /// Creates a running body placed randomly inside `region`.
    pub fn spawn<R: Rng + ?Sized>(id: EntityId, region: &SpawnRegion, rng: &mut R) -> Self {
        let position = Vec2::new(
            rng.gen_range(region.x.clone()),
            rng.gen_range(region.y.clone()),
        );
        let velocity = Vec2::new(
            rng.gen_range(region.speed.clone()),
            rng.gen_range(region.speed.clone()),
        );
        Self::new(id, position, velocity)
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BodyState::Running
    }

    pub fn stop(&mut self) {
        self.state = BodyState::Stopped;
    }
}

/// Region new bodies are placed in before the first tick sees real bounds,
/// and the per-axis speed range (pixels per tick) they start with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnRegion {
    pub x: Range<f32>,
    pub y: Range<f32>,
    pub speed: Range<f32>,
}

impl Default for SpawnRegion {
    fn default() -> Self {
        Self {
            x: 40.0..200.0,
            y: 40.0..160.0,
            speed: 1.0..4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn spawned_body_is_inside_region() {
        let region = SpawnRegion::default();
        let mut rng = StdRng::seed_from_u64(7);
        for id in 0..100 {
            let body = Body::spawn(id, &region, &mut rng);
            assert!(region.x.contains(&body.position.x));
            assert!(region.y.contains(&body.position.y));
            assert!(region.speed.contains(&body.velocity.x));
            assert!(region.speed.contains(&body.velocity.y));
            assert!(body.is_running());
        }
    }

    #[test]
    fn stop_is_one_way() {
        let mut body = Body::new(1, Vec2::ZERO, Vec2::ONE);
        body.stop();
        assert_eq!(body.state(), BodyState::Stopped);
        body.stop();
        assert_eq!(body.state(), BodyState::Stopped);
    }
}
