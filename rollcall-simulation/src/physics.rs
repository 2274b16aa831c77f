//! Per-tick motion of a single body.
//!
//! Motion is explicit Euler with a fixed displacement per tick: velocity is
//! measured in pixels per tick and is never scaled by elapsed time.

use glam::Vec2;
use rollcall_core::{Body, Bounds};

/// Axes on which a body hit a wall during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounce {
    pub x: bool,
    pub y: bool,
}

impl Bounce {
    pub fn any(self) -> bool {
        self.x || self.y
    }
}

/// Advances `body` by one tick inside `bounds` and reflects it off the walls.
///
/// `bounds` must already be effective (see [`Bounds::effective`]) and larger
/// than `2 * radius` on both axes.
pub fn step(body: &mut Body, bounds: Bounds, radius: f32) -> Bounce {
    settle_inside(&mut body.position, bounds, radius);
    body.position += body.velocity;
    reflect(&mut body.position, &mut body.velocity, bounds, radius)
}

/// Pulls a body that lies outside `[0, w] x [0, h]` back onto the surface.
///
/// This happens when the surface shrank or when a body was spawned before the
/// surface had a real size. Per axis, a coordinate below zero moves to one
/// third of the extent and one beyond the extent moves to two thirds, so the
/// body reappears on the side it left from. The result is then clamped to
/// `[radius, extent - radius]`. Axes that are in range are left untouched.
pub fn settle_inside(position: &mut Vec2, bounds: Bounds, radius: f32) {
    position.x = settle_axis(position.x, bounds.width, radius);
    position.y = settle_axis(position.y, bounds.height, radius);
}

fn settle_axis(v: f32, extent: f32, radius: f32) -> f32 {
    let placed = if v < 0.0 {
        extent / 3.0
    } else if v > extent {
        extent * 2.0 / 3.0
    } else {
        return v;
    };
    placed.clamp(radius, extent - radius)
}

/// Clamps the position to `[radius, extent - radius]` and turns the velocity
/// inward on every axis that touched or crossed a wall. Axes are handled independently,
/// so a corner hit flips both components.
pub fn reflect(position: &mut Vec2, velocity: &mut Vec2, bounds: Bounds, radius: f32) -> Bounce {
    let mut hit = Bounce::default();

    if position.x <= radius {
        position.x = radius;
        velocity.x = velocity.x.abs();
        hit.x = true;
    }
    if position.x >= bounds.width - radius {
        position.x = bounds.width - radius;
        velocity.x = -velocity.x.abs();
        hit.x = true;
    }
    if position.y <= radius {
        position.y = radius;
        velocity.y = velocity.y.abs();
        hit.y = true;
    }
    if position.y >= bounds.height - radius {
        position.y = bounds.height - radius;
        velocity.y = -velocity.y.abs();
        hit.y = true;
    }

    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const R: f32 = 14.0;

    fn body_at(x: f32, y: f32, vx: f32, vy: f32) -> Body {
        Body::new(1, Vec2::new(x, y), Vec2::new(vx, vy))
    }

    #[test]
    fn left_wall_bounce() {
        let mut body = body_at(10.0, 100.0, -2.0, 1.0);
        let hit = step(&mut body, Bounds::new(320.0, 200.0), R);

        assert_eq!(body.position, Vec2::new(14.0, 101.0));
        assert_eq!(body.velocity, Vec2::new(2.0, 1.0));
        assert_eq!(hit, Bounce { x: true, y: false });
    }

    #[test]
    fn free_flight_is_plain_euler() {
        let mut body = body_at(100.0, 100.0, 3.0, -2.0);
        let hit = step(&mut body, Bounds::new(320.0, 200.0), R);

        assert_eq!(body.position, Vec2::new(103.0, 98.0));
        assert_eq!(body.velocity, Vec2::new(3.0, -2.0));
        assert!(!hit.any());
    }

    #[test]
    fn corner_hit_flips_both_axes() {
        let mut body = body_at(305.0, 185.0, 3.0, 3.0);
        let hit = step(&mut body, Bounds::new(320.0, 200.0), R);

        assert_eq!(body.position, Vec2::new(306.0, 186.0));
        assert_eq!(body.velocity, Vec2::new(-3.0, -3.0));
        assert_eq!(hit, Bounce { x: true, y: true });
    }

    #[test]
    fn body_outside_shrunk_surface_is_settled() {
        // Surface shrank from 640 to 320 wide while the body sat at x = 500.
        let mut body = body_at(500.0, 100.0, 1.0, 0.0);
        step(&mut body, Bounds::new(320.0, 200.0), R);

        let expected_x = 320.0 * 2.0 / 3.0 + 1.0;
        assert!((body.position.x - expected_x).abs() < 1e-4);
        assert_eq!(body.position.y, 100.0);
    }

    #[test]
    fn negative_coordinate_moves_to_near_third() {
        let mut position = Vec2::new(-5.0, 50.0);
        settle_inside(&mut position, Bounds::new(300.0, 200.0), R);
        assert_eq!(position, Vec2::new(100.0, 50.0));
    }

    #[test]
    fn bodies_never_leave_the_inner_box() {
        let mut rng = StdRng::seed_from_u64(99);
        let bounds = Bounds::new(320.0, 200.0);

        for _ in 0..200 {
            let mut body = body_at(
                rng.gen_range(-100.0..500.0),
                rng.gen_range(-100.0..400.0),
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
            );
            for _ in 0..50 {
                let before = body.velocity;
                let hit = step(&mut body, bounds, R);

                assert!(body.position.x >= R && body.position.x <= bounds.width - R);
                assert!(body.position.y >= R && body.position.y <= bounds.height - R);
                if !hit.x {
                    assert_eq!(body.velocity.x, before.x);
                }
                if !hit.y {
                    assert_eq!(body.velocity.y, before.y);
                }
            }
        }
    }
}
