//! Draw the particles, and the lines between particles that are near each other.
//!
//! Every ordered pair is visited, so a line between 2 particles is normally drawn twice per tick,
//! once from each end. With a translucent line colour that doubles up the opacity, which is part
//! of the look. Pairs at exactly zero distance are skipped, and that includes 2 *different*
//! particles that happen to sit on the same spot.

use crate::config::SimulationConfig;
use crate::geometry::distance;
use crate::particle::Particle;
use crate::surface::DrawingSurface;

/// Whether a pair of particles should be joined.
#[expect(
    clippy::float_cmp,
    reason = "Only an exact zero, like the distance from a particle to itself, is skipped"
)]
fn is_connected(from: &Particle, to: &Particle, max_distance: f32) -> bool {
    let gap = distance(from.position, to.position);
    if gap == 0.0 {
        return false;
    }
    gap <= max_distance
}

/// Call `callback` for every pair of particles that should be joined by a line, in drawing order.
///
/// When `dedup` is set each pair is only visited once, from the particle that comes first.
#[inline]
pub fn for_each_edge<F>(particles: &[Particle], max_distance: f32, dedup: bool, mut callback: F)
where
    F: FnMut(&Particle, &Particle),
{
    for (index, from) in particles.iter().enumerate() {
        let candidates = if dedup {
            particles.get(index + 1..).unwrap_or_default()
        } else {
            particles
        };

        for to in candidates {
            if is_connected(from, to, max_distance) {
                callback(from, to);
            }
        }
    }
}

/// The ids of every joined pair, in drawing order.
#[inline]
#[must_use]
pub fn edges(particles: &[Particle], max_distance: f32, dedup: bool) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for_each_edge(particles, max_distance, dedup, |from, to| {
        pairs.push((from.id, to.id));
    });
    pairs
}

/// Draw all the particles, then all the lines between them. Returns how many lines were drawn.
#[inline]
pub fn render<S: DrawingSurface + ?Sized>(
    particles: &[Particle],
    config: &SimulationConfig,
    surface: &mut S,
) -> usize {
    for particle in particles {
        surface.fill_circle(particle.position, particle.radius(), particle.colour);
    }

    let mut count = 0;
    for_each_edge(
        particles,
        config.max_distance,
        config.dedup_pairs,
        |from, to| {
            surface.stroke_line(from.position, to.position, config.line_colour);
            count += 1;
        },
    );
    count
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use super::*;
    use crate::geometry::make_point;
    use crate::tests::recorder::{DrawCall, Recorder};

    fn particle_at(id: usize, x: f32, y: f32) -> Particle {
        Particle::new(
            id,
            make_point(x, y),
            glam::Vec2::ZERO,
            1.0,
            crate::colour::WHITE,
        )
    }

    #[test]
    fn close_pairs_are_joined_in_both_directions() {
        let particles = vec![particle_at(0, 0.0, 0.0), particle_at(1, 3.0, 4.0)];
        assert_eq!(edges(&particles, 5.0, false), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let particles = vec![particle_at(0, 0.0, 0.0), particle_at(1, 3.0, 4.0)];
        assert_eq!(edges(&particles, 5.0, false).len(), 2);
        assert!(edges(&particles, 4.99, false).is_empty());
    }

    #[test]
    fn coincident_particles_are_never_joined() {
        let particles = vec![
            particle_at(0, 10.0, 10.0),
            particle_at(1, 10.0, 10.0),
            particle_at(2, 12.0, 10.0),
        ];
        assert_eq!(
            edges(&particles, 100.0, false),
            vec![(0, 2), (1, 2), (2, 0), (2, 1)]
        );
    }

    #[test]
    fn dedup_only_draws_each_pair_once() {
        let particles = vec![
            particle_at(0, 0.0, 0.0),
            particle_at(1, 1.0, 0.0),
            particle_at(2, 2.0, 0.0),
        ];
        assert_eq!(
            edges(&particles, 1.5, true),
            vec![(0, 1), (1, 2)]
        );
        assert_eq!(edges(&particles, 1.5, false).len(), 4);
    }

    #[test]
    fn negative_threshold_joins_nothing() {
        let particles = vec![particle_at(0, 0.0, 0.0), particle_at(1, 1.0, 0.0)];
        assert!(edges(&particles, -1.0, false).is_empty());
    }

    #[test]
    fn discs_are_drawn_before_lines() {
        let particles = vec![particle_at(0, 0.0, 0.0), particle_at(1, 3.0, 4.0)];
        let config = SimulationConfig {
            max_distance: 10.0,
            ..SimulationConfig::default()
        };
        let mut recorder = Recorder::default();

        let count = render(&particles, &config, &mut recorder);

        assert_eq!(count, 2);
        assert_eq!(recorder.calls.len(), 4);
        assert!(matches!(recorder.calls[0], DrawCall::Circle { .. }));
        assert!(matches!(recorder.calls[1], DrawCall::Circle { .. }));
        assert_eq!(
            recorder.calls[2],
            DrawCall::Line {
                from: make_point(0.0, 0.0),
                to: make_point(3.0, 4.0),
                colour: config.line_colour,
            }
        );
        assert_eq!(
            recorder.calls[3],
            DrawCall::Line {
                from: make_point(3.0, 4.0),
                to: make_point(0.0, 0.0),
                colour: config.line_colour,
            }
        );
    }
}
