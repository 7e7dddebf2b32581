//! The one place that owns the particles and the config they're made from. Every edit, whether
//! it's a settings change, a pause or a resize, goes through here and never while a tick is
//! running.

use rand::SeedableRng as _;

use crate::config::{ConfigChange, SimulationConfig};
use crate::errors::CoreError;
use crate::integrator;
use crate::particle::Particle;
use crate::proximity;
use crate::surface::DrawingSurface;

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TickOutcome {
    /// The simulation is paused, nothing moved or was drawn.
    Paused,
    /// There are no particles, or there's nowhere to draw them.
    Empty,
    /// Particles moved and were drawn.
    Drawn {
        /// How many particles were drawn
        particles: usize,
        /// How many proximity lines were drawn
        edges: usize,
    },
}

impl TickOutcome {
    /// Whether anything was painted on the surface.
    #[inline]
    #[must_use]
    pub const fn has_drawn(&self) -> bool {
        matches!(self, Self::Drawn { .. })
    }
}

/// The simulation.
#[derive(Debug)]
pub struct SimulationState {
    /// The current parameters
    config: SimulationConfig,
    /// The active particles, in id order
    particles: Vec<Particle>,
    /// Source of randomness for spawning particles
    rng: rand::rngs::StdRng,
}

impl SimulationState {
    /// Instantiate. There aren't any particles until the first [`Self::reset`].
    ///
    /// # Errors
    /// If the config has unusable values.
    #[inline]
    pub fn new(config: SimulationConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let rng = config.seed.map_or_else(
            rand::rngs::StdRng::from_entropy,
            rand::rngs::StdRng::seed_from_u64,
        );

        Ok(Self {
            config,
            particles: Vec::new(),
            rng,
        })
    }

    /// The current parameters.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The active particles.
    #[inline]
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Whether ticks are currently skipped.
    #[inline]
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.config.paused
    }

    /// Throw away every particle, paint the background and spawn a whole new set. A reset holds
    /// the only mutable borrow, so no tick can ever see it half done.
    #[inline]
    pub fn reset<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S) {
        self.particles.clear();
        self.fill_background(surface);

        if let Some(seed) = self.config.seed {
            self.rng = rand::rngs::StdRng::seed_from_u64(seed);
        }

        self.particles = (0..self.config.particle_count)
            .map(|id| Particle::spawn(&self.config, id, &mut self.rng))
            .collect();

        tracing::debug!(
            "Reset simulation with {} particles in a {}x{} viewport",
            self.particles.len(),
            self.config.viewport.width,
            self.config.viewport.height
        );
    }

    /// Move every particle, then draw them and the lines between them. The surface is never
    /// cleared first.
    #[inline]
    pub fn tick<S: DrawingSurface + ?Sized>(&mut self, surface: &mut S) -> TickOutcome {
        if self.config.paused {
            return TickOutcome::Paused;
        }
        if self.particles.is_empty() || !self.config.viewport.is_drawable() {
            return TickOutcome::Empty;
        }

        integrator::step_all(&mut self.particles, self.config.viewport.max_point);
        let edges = proximity::render(&self.particles, &self.config, surface);

        TickOutcome::Drawn {
            particles: self.particles.len(),
            edges,
        }
    }

    /// Apply a single parameter edit along with its side effects.
    ///
    /// # Errors
    /// If the new value is unusable, in which case nothing changes.
    #[inline]
    pub fn apply<S: DrawingSurface + ?Sized>(
        &mut self,
        change: &ConfigChange,
        surface: &mut S,
    ) -> Result<(), CoreError> {
        change.validate()?;

        tracing::debug!("Applying config change: {change:?}");
        self.apply_in_place(change, change.is_regenerating(), surface);
        if change.is_regenerating() {
            self.reset(surface);
        }
        Ok(())
    }

    /// Apply a batch of edits, like all the differences from a reloaded config file. Nothing is
    /// applied unless every edit is usable. However many regenerating edits there are, there's
    /// only one reset, after all the fields have been updated.
    ///
    /// Returns whether there was a reset.
    ///
    /// # Errors
    /// On the first unusable value, in which case nothing changes.
    #[inline]
    pub fn apply_all<S: DrawingSurface + ?Sized>(
        &mut self,
        changes: &[ConfigChange],
        surface: &mut S,
    ) -> Result<bool, CoreError> {
        for change in changes {
            change.validate()?;
        }

        let needs_reset = changes.iter().any(ConfigChange::is_regenerating);
        for change in changes {
            tracing::debug!("Applying config change: {change:?}");
            self.apply_in_place(change, needs_reset, surface);
        }

        if needs_reset {
            self.reset(surface);
        }
        Ok(needs_reset)
    }

    /// Update the config field and do whatever doesn't need a reset. When a reset is about to
    /// follow, the background is left for the reset to paint.
    fn apply_in_place<S: DrawingSurface + ?Sized>(
        &mut self,
        change: &ConfigChange,
        is_reset_pending: bool,
        surface: &mut S,
    ) {
        self.config.set(change);

        match change {
            ConfigChange::ParticleColour(colour) => {
                for particle in &mut self.particles {
                    particle.colour = *colour;
                }
            }
            ConfigChange::BackgroundColour(_) if !is_reset_pending => {
                self.fill_background(surface);
            }
            _ => (),
        }
    }

    /// Flip the pause state. Returns whether the simulation is now paused.
    #[inline]
    pub fn toggle_pause(&mut self) -> bool {
        self.config.paused = !self.config.paused;
        tracing::debug!("Simulation paused: {}", self.config.paused);
        self.config.paused
    }

    /// Explicitly set the pause state.
    #[inline]
    pub fn set_paused(&mut self, paused: bool) {
        self.config.paused = paused;
    }

    /// Paint over everything with the background colour. Particles carry on as they were.
    #[inline]
    pub fn redraw<S: DrawingSurface + ?Sized>(&self, surface: &mut S) {
        self.fill_background(surface);
    }

    /// Handle new viewport dimensions. Existing particles aren't rescaled, there's just a full
    /// reset. Returns whether the dimensions actually changed.
    #[inline]
    pub fn resize<S: DrawingSurface + ?Sized>(
        &mut self,
        width: usize,
        height: usize,
        surface: &mut S,
    ) -> bool {
        if !self.config.viewport.set_bounds(width, height) {
            return false;
        }

        tracing::debug!("Viewport resized to {width}x{height}");
        surface.resize(width, height);
        self.reset(surface);
        true
    }

    /// Fill the whole viewport with the background colour.
    fn fill_background<S: DrawingSurface + ?Sized>(&self, surface: &mut S) {
        let viewport = &self.config.viewport;
        surface.fill_rect(
            viewport.min_point,
            viewport.max_point - viewport.min_point,
            self.config.background_colour,
        );
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;
    use crate::geometry::make_point;
    use crate::tests::recorder::{DrawCall, Recorder};
    use crate::viewport::Viewport;

    fn config() -> SimulationConfig {
        SimulationConfig {
            viewport: Viewport::new(200, 100),
            particle_count: 30,
            max_radius: 4.0,
            max_distance: 40.0,
            acceleration_x: 1.0,
            vertical_velocity: 1.0,
            seed: Some(7),
            ..SimulationConfig::default()
        }
    }

    fn started() -> (SimulationState, Recorder) {
        let mut state = SimulationState::new(config()).unwrap();
        let mut recorder = Recorder::default();
        state.reset(&mut recorder);
        recorder.clear();
        (state, recorder)
    }

    fn assert_ids_are_sequential(state: &SimulationState) {
        assert_eq!(state.particles().len(), state.config().particle_count);
        for (index, particle) in state.particles().iter().enumerate() {
            assert_eq!(particle.id, index);
        }
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = SimulationConfig {
            max_distance: f32::NAN,
            ..config()
        };
        assert!(SimulationState::new(config).is_err());
    }

    #[test]
    fn reset_paints_background_once_then_spawns() {
        let mut state = SimulationState::new(config()).unwrap();
        let mut recorder = Recorder::default();
        state.reset(&mut recorder);

        assert_eq!(
            recorder.calls,
            vec![DrawCall::Rect {
                origin: make_point(0.0, 0.0),
                extent: make_point(200.0, 100.0),
                colour: crate::colour::BLACK,
            }]
        );
        assert_ids_are_sequential(&state);
    }

    #[test]
    fn ticks_draw_without_clearing() {
        let (mut state, mut recorder) = started();

        for _ in 0..10 {
            let outcome = state.tick(&mut recorder);
            assert!(outcome.has_drawn());
        }

        assert!(recorder.rects().is_empty());
        assert_eq!(recorder.circles(), 300);
    }

    #[test]
    fn tick_reports_what_it_drew() {
        let (mut state, mut recorder) = started();
        let outcome = state.tick(&mut recorder);

        let expected_edges =
            proximity::edges(state.particles(), state.config().max_distance, false).len();
        assert_eq!(
            outcome,
            TickOutcome::Drawn {
                particles: 30,
                edges: expected_edges
            }
        );
        assert_eq!(recorder.lines(), expected_edges);
    }

    #[test]
    fn regenerating_change_resets() {
        let (mut state, mut recorder) = started();
        state
            .apply(&ConfigChange::ParticleCount(12), &mut recorder)
            .unwrap();

        assert_ids_are_sequential(&state);
        assert_eq!(state.particles().len(), 12);
        assert_eq!(recorder.rects().len(), 1);
    }

    #[test]
    fn every_regenerating_change_gives_a_fresh_set() {
        let changes = [
            ConfigChange::MaxRadius(2.0),
            ConfigChange::MaxDistance(5.0),
            ConfigChange::AccelerationX(3.0),
            ConfigChange::VerticalVelocity(-1.0),
            ConfigChange::DedupPairs(true),
            ConfigChange::Seed(Some(99)),
        ];
        for change in changes {
            let (mut state, mut recorder) = started();
            state.tick(&mut recorder);
            state.apply(&change, &mut recorder).unwrap();
            assert_ids_are_sequential(&state);
            assert_eq!(recorder.rects().len(), 1, "{change:?}");
        }
    }

    #[test]
    fn batches_only_reset_once() {
        let (mut state, mut recorder) = started();
        let changes = vec![
            ConfigChange::ParticleCount(5),
            ConfigChange::MaxRadius(1.0),
            ConfigChange::LineColour(crate::colour::WHITE),
        ];

        let did_reset = state.apply_all(&changes, &mut recorder).unwrap();

        assert!(did_reset);
        assert_eq!(recorder.rects().len(), 1);
        assert_eq!(state.particles().len(), 5);
        assert_eq!(state.config().max_radius, 1.0);
        assert_eq!(state.config().line_colour, crate::colour::WHITE);
        for particle in state.particles() {
            assert!(particle.radius() < 1.0);
        }
    }

    #[test]
    fn batch_with_new_background_and_reset_fills_once() {
        let (mut state, mut recorder) = started();
        let changes = vec![
            ConfigChange::ParticleCount(5),
            ConfigChange::BackgroundColour(crate::colour::WHITE),
        ];

        assert!(state.apply_all(&changes, &mut recorder).unwrap());

        assert_eq!(
            recorder.calls,
            vec![DrawCall::Rect {
                origin: make_point(0.0, 0.0),
                extent: make_point(200.0, 100.0),
                colour: crate::colour::WHITE,
            }]
        );
        assert_eq!(state.particles().len(), 5);
    }

    #[test]
    fn batch_with_only_new_background_fills_without_reset() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();
        let changes = vec![
            ConfigChange::LineColour(crate::colour::WHITE),
            ConfigChange::BackgroundColour(crate::colour::WHITE),
        ];

        assert!(!state.apply_all(&changes, &mut recorder).unwrap());

        assert_eq!(recorder.rects().len(), 1);
        assert_eq!(state.particles(), before.as_slice());
    }

    #[test]
    fn batch_with_a_bad_value_changes_nothing() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();
        let changes = vec![
            ConfigChange::ParticleCount(5),
            ConfigChange::AccelerationX(f32::INFINITY),
        ];

        assert!(state.apply_all(&changes, &mut recorder).is_err());
        assert_eq!(state.config(), &config());
        assert_eq!(state.particles(), before.as_slice());
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn particle_colour_only_recolours() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();
        let red = (1.0, 0.0, 0.0, 1.0);

        state
            .apply(&ConfigChange::ParticleColour(red), &mut recorder)
            .unwrap();

        assert!(recorder.calls.is_empty());
        for (particle, old) in state.particles().iter().zip(before) {
            assert_eq!(particle.colour, red);
            assert_eq!(particle.position, old.position);
            assert_eq!(particle.velocity, old.velocity);
            assert_eq!(particle.id, old.id);
        }
    }

    #[test]
    fn line_colour_draws_nothing() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();

        state
            .apply(&ConfigChange::LineColour(crate::colour::WHITE), &mut recorder)
            .unwrap();

        assert!(recorder.calls.is_empty());
        assert_eq!(state.particles(), before.as_slice());
        assert_eq!(state.config().line_colour, crate::colour::WHITE);
    }

    #[test]
    fn background_colour_fills_immediately() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();

        state
            .apply(
                &ConfigChange::BackgroundColour(crate::colour::WHITE),
                &mut recorder,
            )
            .unwrap();

        assert_eq!(
            recorder.calls,
            vec![DrawCall::Rect {
                origin: make_point(0.0, 0.0),
                extent: make_point(200.0, 100.0),
                colour: crate::colour::WHITE,
            }]
        );
        assert_eq!(state.particles(), before.as_slice());
    }

    #[test]
    fn pausing_freezes_everything() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();

        assert!(state.toggle_pause());
        for _ in 0..5 {
            assert_eq!(state.tick(&mut recorder), TickOutcome::Paused);
        }
        assert!(!state.toggle_pause());

        assert!(recorder.calls.is_empty());
        assert_eq!(state.particles(), before.as_slice());
        assert_eq!(state.config(), &config());
    }

    #[test]
    fn redraw_paints_over_without_touching_particles() {
        let (mut state, mut recorder) = started();
        state.tick(&mut recorder);
        let before = state.particles().to_vec();
        recorder.clear();

        state.redraw(&mut recorder);

        assert_eq!(recorder.rects().len(), 1);
        assert_eq!(recorder.calls.len(), 1);
        assert_eq!(state.particles(), before.as_slice());
    }

    #[test]
    fn zero_particles_never_draw() {
        let config = SimulationConfig {
            particle_count: 0,
            ..config()
        };
        let mut state = SimulationState::new(config).unwrap();
        let mut recorder = Recorder::default();
        state.reset(&mut recorder);
        recorder.clear();

        assert_eq!(state.tick(&mut recorder), TickOutcome::Empty);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn zero_sized_viewport_never_draws() {
        let (mut state, mut recorder) = started();
        assert!(state.resize(0, 0, &mut recorder));
        recorder.clear();

        assert_eq!(state.particles().len(), 30);
        assert_eq!(state.tick(&mut recorder), TickOutcome::Empty);
        assert!(recorder.calls.is_empty());

        assert!(state.resize(10, 10, &mut recorder));
        recorder.clear();
        assert!(state.tick(&mut recorder).has_drawn());
    }

    #[test]
    fn resizing_resets_into_the_new_bounds() {
        let (mut state, mut recorder) = started();

        assert!(state.resize(40, 20, &mut recorder));

        assert_eq!(
            recorder.calls[0],
            DrawCall::Resize {
                width: 40,
                height: 20
            }
        );
        assert_eq!(
            recorder.calls[1],
            DrawCall::Rect {
                origin: make_point(0.0, 0.0),
                extent: make_point(40.0, 20.0),
                colour: crate::colour::BLACK,
            }
        );
        assert_eq!(state.config().viewport.max_point, make_point(40.0, 20.0));
        assert_ids_are_sequential(&state);
        for particle in state.particles() {
            assert!(particle.position.x < 40.0);
            assert!(particle.position.y < 20.0);
        }
    }

    #[test]
    fn resizing_to_the_same_bounds_does_nothing() {
        let (mut state, mut recorder) = started();
        let before = state.particles().to_vec();

        assert!(!state.resize(200, 100, &mut recorder));
        assert!(recorder.calls.is_empty());
        assert_eq!(state.particles(), before.as_slice());
    }

    #[test]
    fn seeded_resets_are_reproducible() {
        let (mut first, mut recorder) = started();
        let (second, _) = started();
        assert_eq!(first.particles(), second.particles());

        first.tick(&mut recorder);
        first.reset(&mut recorder);
        assert_eq!(first.particles(), second.particles());
    }
}
