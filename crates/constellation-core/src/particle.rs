//! A single particle, and spawning new ones.

use rand::Rng;

use crate::colour::Colour;
use crate::config::SimulationConfig;
use crate::geometry::{make_point, Point};

/// A disc that bounces around the viewport.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Particle {
    /// Its place in creation order. Stable for the particle's lifetime.
    pub id: usize,
    /// Centre of the disc, in pixels. Can briefly be outside the viewport.
    pub position: Point,
    /// Displacement per tick.
    pub velocity: glam::Vec2,
    /// Fill colour.
    pub colour: Colour,
    /// Radius of the disc. Never changes once the particle exists, so it's only readable.
    radius: f32,
}

impl Particle {
    /// Instantiate
    #[inline]
    #[must_use]
    pub const fn new(
        id: usize,
        position: Point,
        velocity: glam::Vec2,
        radius: f32,
        colour: Colour,
    ) -> Self {
        Self {
            id,
            position,
            velocity,
            colour,
            radius,
        }
    }

    /// Make a new particle somewhere random in the viewport.
    ///
    /// The radius and both coordinates are whole numbers drawn independently and uniformly. The
    /// position isn't inset by the radius, so a fresh particle can poke out of the viewport.
    ///
    /// Horizontal speed comes from the radius, so bigger particles move faster. It always starts
    /// off non-negative, bounces decide the direction from then on. Vertical speed is the same
    /// for everybody.
    #[inline]
    #[must_use]
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        reason = "Viewports are nowhere near big enough to lose precision"
    )]
    pub fn spawn<R: Rng + ?Sized>(config: &SimulationConfig, id: usize, rng: &mut R) -> Self {
        let radius = (rng.gen::<f32>() * config.max_radius).floor();
        let x = (rng.gen::<f32>() * config.viewport.width as f32).floor();
        let y = (rng.gen::<f32>() * config.viewport.height as f32).floor();

        Self::new(
            id,
            make_point(x, y),
            glam::Vec2::new(config.acceleration_x * radius, config.vertical_velocity),
            radius,
            config.particle_colour,
        )
    }

    /// Radius of the disc.
    #[inline]
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            viewport: crate::viewport::Viewport::new(200, 100),
            max_radius: 5.0,
            acceleration_x: 2.0,
            vertical_velocity: 1.96,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn spawned_particles_are_in_range() {
        let config = config();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for id in 0..500 {
            let particle = Particle::spawn(&config, id, &mut rng);
            assert_eq!(particle.id, id);
            assert!((0.0..5.0).contains(&particle.radius()));
            assert!((0.0..200.0).contains(&particle.position.x));
            assert!((0.0..100.0).contains(&particle.position.y));
            assert_eq!(particle.radius().fract(), 0.0);
            assert_eq!(particle.position.x.fract(), 0.0);
            assert_eq!(particle.position.y.fract(), 0.0);
        }
    }

    #[test]
    fn velocity_comes_from_config_and_radius() {
        let config = config();
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        for id in 0..100 {
            let particle = Particle::spawn(&config, id, &mut rng);
            assert_eq!(particle.velocity.x, 2.0 * particle.radius());
            assert!(particle.velocity.x >= 0.0);
            assert_eq!(particle.velocity.y, 1.96);
            assert_eq!(particle.colour, config.particle_colour);
        }
    }

    #[test]
    fn zero_max_radius_makes_still_points() {
        let config = SimulationConfig {
            max_radius: 0.0,
            ..config()
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let particle = Particle::spawn(&config, 0, &mut rng);
        assert_eq!(particle.radius(), 0.0);
        assert_eq!(particle.velocity.x, 0.0);
    }

    #[test]
    fn same_seed_same_particle() {
        let config = config();
        let first = Particle::spawn(&config, 0, &mut rand::rngs::StdRng::seed_from_u64(9));
        let second = Particle::spawn(&config, 0, &mut rand::rngs::StdRng::seed_from_u64(9));
        assert_eq!(first, second);
    }
}
