//! Move particles and bounce them off the edges of the viewport.
//!
//! The bounce check looks at where a particle is *before* it moves, and the possibly flipped
//! velocity is applied in the same tick. So a fast particle that is just short of an edge sails
//! past it for exactly one tick, and is sent back inside on the next one.

use crate::geometry::Point;
use crate::particle::Particle;

/// Advance a particle by one tick.
#[inline]
pub fn step(particle: &mut Particle, bounds: Point) {
    let radius = particle.radius();
    particle.velocity.x = reflect(particle.position.x, particle.velocity.x, radius, bounds.x);
    particle.velocity.y = reflect(particle.position.y, particle.velocity.y, radius, bounds.y);
    particle.position += particle.velocity;
}

/// Advance every particle by one tick.
#[inline]
pub fn step_all(particles: &mut [Particle], bounds: Point) {
    for particle in particles {
        step(particle, bounds);
    }
}

/// The velocity of one axis after checking for a bounce. Only the sign ever changes.
fn reflect(position: f32, velocity: f32, radius: f32, bound: f32) -> f32 {
    if position >= bound - radius {
        -velocity
    } else if position <= radius {
        velocity.abs()
    } else {
        velocity
    }
}

#[cfg(test)]
mod test {
    use rand::{Rng as _, SeedableRng as _};

    use super::*;
    use crate::geometry::make_point;

    fn particle(x: f32, y: f32, vx: f32, vy: f32, radius: f32) -> Particle {
        Particle::new(
            0,
            make_point(x, y),
            glam::Vec2::new(vx, vy),
            radius,
            crate::colour::WHITE,
        )
    }

    #[test]
    fn free_flight() {
        let mut particle = particle(50.0, 50.0, 3.0, -2.0, 5.0);
        step(&mut particle, make_point(100.0, 100.0));
        assert_eq!(particle.position, make_point(53.0, 48.0));
        assert_eq!(particle.velocity, glam::Vec2::new(3.0, -2.0));
    }

    #[test]
    fn overshoots_for_exactly_one_tick() {
        let bounds = make_point(100.0, 100.0);
        let mut particle = particle(94.0, 50.0, 10.0, 0.0, 5.0);

        step(&mut particle, bounds);
        assert_eq!(particle.position.x, 104.0);
        assert_eq!(particle.velocity.x, 10.0);

        step(&mut particle, bounds);
        assert_eq!(particle.velocity.x, -10.0);
        assert_eq!(particle.position.x, 94.0);
    }

    #[test]
    fn flips_at_the_far_edge_threshold() {
        let mut particle = particle(95.0, 50.0, 2.0, 0.0, 5.0);
        step(&mut particle, make_point(100.0, 100.0));
        assert_eq!(particle.velocity.x, -2.0);
        assert_eq!(particle.position.x, 93.0);
    }

    #[test]
    fn near_edge_forces_positive_velocity() {
        let bounds = make_point(100.0, 100.0);

        let mut moving_away = particle(3.0, 50.0, 4.0, 0.0, 5.0);
        step(&mut moving_away, bounds);
        assert_eq!(moving_away.velocity.x, 4.0);
        assert_eq!(moving_away.position.x, 7.0);

        let mut moving_towards = particle(50.0, -6.0, 0.0, -4.0, 5.0);
        step(&mut moving_towards, bounds);
        assert_eq!(moving_towards.velocity.y, 4.0);
        assert_eq!(moving_towards.position.y, -2.0);
    }

    #[test]
    fn both_axes_can_flip_in_one_tick() {
        let mut particle = particle(99.0, 99.0, 1.0, 1.0, 2.0);
        step(&mut particle, make_point(100.0, 100.0));
        assert_eq!(particle.velocity, glam::Vec2::new(-1.0, -1.0));
        assert_eq!(particle.position, make_point(98.0, 98.0));
    }

    #[test]
    fn far_edge_wins_when_the_viewport_is_narrower_than_the_particle() {
        let bounds = make_point(4.0, 100.0);

        let mut moving_right = particle(2.0, 50.0, 3.0, 0.0, 3.0);
        step(&mut moving_right, bounds);
        assert_eq!(moving_right.velocity.x, -3.0);
        assert_eq!(moving_right.position.x, -1.0);

        step(&mut moving_right, bounds);
        assert_eq!(moving_right.velocity.x, 3.0);
        assert_eq!(moving_right.position.x, 2.0);

        let mut moving_left = particle(2.0, 50.0, -3.0, 0.0, 3.0);
        step(&mut moving_left, bounds);
        assert_eq!(moving_left.velocity.x, 3.0);
        assert_eq!(moving_left.position.x, 5.0);
    }

    #[test]
    fn zero_radius_particles_still_bounce() {
        let mut particle = particle(0.0, 10.0, -1.0, 0.0, 0.0);
        step(&mut particle, make_point(100.0, 100.0));
        assert_eq!(particle.velocity.x, 1.0);
        assert_eq!(particle.position.x, 1.0);
    }

    #[test]
    fn speed_never_changes() {
        let bounds = make_point(120.0, 80.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut particles: Vec<Particle> = (0..50)
            .map(|id| {
                let radius = rng.gen_range(0.0..6.0_f32).floor();
                Particle::new(
                    id,
                    make_point(rng.gen_range(0.0..120.0), rng.gen_range(0.0..80.0)),
                    glam::Vec2::new(radius * 1.5, 1.96),
                    radius,
                    crate::colour::WHITE,
                )
            })
            .collect();
        let speeds: Vec<glam::Vec2> = particles.iter().map(|p| p.velocity.abs()).collect();

        for _ in 0..1_000 {
            step_all(&mut particles, bounds);
            for (particle, speed) in particles.iter().zip(&speeds) {
                assert_eq!(particle.velocity.abs(), *speed);
            }
        }
    }

    #[test]
    fn particles_never_stray_more_than_one_tick_outside() {
        let bounds = make_point(100.0, 100.0);
        let mut particle = particle(50.0, 50.0, 7.0, 3.0, 2.0);
        for _ in 0..10_000 {
            step(&mut particle, bounds);
            assert!(particle.position.x > -7.0 && particle.position.x < 107.0);
            assert!(particle.position.y > -3.0 && particle.position.y < 103.0);
        }
    }
}
