//! Everything that can be tweaked about a running simulation, and the individual edits that can
//! be made to it.

use crate::colour::Colour;
use crate::errors::{CoreError, InvalidConfigSnafu};
use crate::viewport::Viewport;

/// All the parameters that the particles, the integrator and the proximity lines read from.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct SimulationConfig {
    /// The bounds that particles spawn in and bounce off.
    pub viewport: Viewport,
    /// How many particles there are after a reset.
    pub particle_count: usize,
    /// Radii are drawn from `[0, max_radius)`.
    pub max_radius: f32,
    /// Particles closer than this are joined by a line.
    pub max_distance: f32,
    /// Multiplied by a particle's radius to get its horizontal speed. So big particles are fast.
    pub acceleration_x: f32,
    /// The vertical displacement every particle gets every tick. It is constant, it does not
    /// accumulate like real gravity.
    pub vertical_velocity: f32,
    /// Fill colour of the particles.
    pub particle_colour: Colour,
    /// Colour of the proximity lines.
    pub line_colour: Colour,
    /// Colour painted over the viewport on reset, redraw and background change.
    pub background_colour: Colour,
    /// Whether ticks are currently skipped.
    pub paused: bool,
    /// Only draw each proximity line once, rather than once in each direction.
    pub dedup_pairs: bool,
    /// Seed for particle generation. `None` means a fresh random layout on every reset.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            particle_count: 60,
            max_radius: 3.0,
            max_distance: 18.0,
            acceleration_x: 0.5,
            vertical_velocity: 0.49,
            particle_colour: (1.0, 1.0, 1.0, 0.5),
            line_colour: (0.47, 0.627, 1.0, 0.1),
            background_colour: crate::colour::BLACK,
            paused: false,
            dedup_pairs: false,
            seed: None,
        }
    }
}

/// A single edit of a single parameter, carrying the new value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigChange {
    /// Number of particles
    ParticleCount(usize),
    /// Maximum particle radius
    MaxRadius(f32),
    /// Proximity threshold
    MaxDistance(f32),
    /// Horizontal speed per unit of radius
    AccelerationX(f32),
    /// Per-tick vertical displacement
    VerticalVelocity(f32),
    /// Draw proximity lines once per pair
    DedupPairs(bool),
    /// Particle generation seed
    Seed(Option<u64>),
    /// Fill colour of particles
    ParticleColour(Colour),
    /// Colour of proximity lines
    LineColour(Colour),
    /// Background colour
    BackgroundColour(Colour),
}

impl ConfigChange {
    /// Whether applying this change throws away all the particles and spawns new ones. All the
    /// other changes are made in place.
    #[inline]
    #[must_use]
    pub const fn is_regenerating(&self) -> bool {
        match self {
            Self::ParticleCount(_)
            | Self::MaxRadius(_)
            | Self::MaxDistance(_)
            | Self::AccelerationX(_)
            | Self::VerticalVelocity(_)
            | Self::DedupPairs(_)
            | Self::Seed(_) => true,
            Self::ParticleColour(_) | Self::LineColour(_) | Self::BackgroundColour(_) => false,
        }
    }

    /// The config field that this change edits.
    #[inline]
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::ParticleCount(_) => "particle_count",
            Self::MaxRadius(_) => "max_radius",
            Self::MaxDistance(_) => "max_distance",
            Self::AccelerationX(_) => "acceleration_x",
            Self::VerticalVelocity(_) => "vertical_velocity",
            Self::DedupPairs(_) => "dedup_pairs",
            Self::Seed(_) => "seed",
            Self::ParticleColour(_) => "particle_colour",
            Self::LineColour(_) => "line_colour",
            Self::BackgroundColour(_) => "background_colour",
        }
    }

    /// Refuse values that would poison the simulation.
    ///
    /// Non-finite numbers are always refused. A negative `max_radius` is refused too, but a
    /// negative `max_distance` is allowed: no line ever qualifies, which is a perfectly sensible
    /// way of turning lines off.
    ///
    /// # Errors
    /// When the value can't be used.
    #[inline]
    pub fn validate(&self) -> Result<(), CoreError> {
        let field = self.field();
        match self {
            Self::MaxRadius(value) => {
                ensure_finite(field, *value)?;
                if *value < 0.0 {
                    return InvalidConfigSnafu {
                        field,
                        reason: format!("{value} is negative"),
                    }
                    .fail();
                }
            }
            Self::MaxDistance(value) | Self::AccelerationX(value) | Self::VerticalVelocity(value) => {
                ensure_finite(field, *value)?;
            }
            Self::ParticleColour(colour) | Self::LineColour(colour) | Self::BackgroundColour(colour) => {
                for channel in [colour.0, colour.1, colour.2, colour.3] {
                    ensure_finite(field, channel)?;
                }
            }
            Self::ParticleCount(_) | Self::DedupPairs(_) | Self::Seed(_) => (),
        }

        Ok(())
    }
}

/// Refuse NaN and infinities.
fn ensure_finite(field: &str, value: f32) -> Result<(), CoreError> {
    if value.is_finite() {
        return Ok(());
    }

    InvalidConfigSnafu {
        field,
        reason: format!("{value} is not a finite number"),
    }
    .fail()
}

impl SimulationConfig {
    /// Check every parameter.
    ///
    /// # Errors
    /// On the first parameter that can't be used.
    #[inline]
    pub fn validate(&self) -> Result<(), CoreError> {
        for change in self.as_changes() {
            change.validate()?;
        }
        Ok(())
    }

    /// Every parameter expressed as a change, in field declaration order.
    #[inline]
    #[must_use]
    pub fn as_changes(&self) -> Vec<ConfigChange> {
        vec![
            ConfigChange::ParticleCount(self.particle_count),
            ConfigChange::MaxRadius(self.max_radius),
            ConfigChange::MaxDistance(self.max_distance),
            ConfigChange::AccelerationX(self.acceleration_x),
            ConfigChange::VerticalVelocity(self.vertical_velocity),
            ConfigChange::ParticleColour(self.particle_colour),
            ConfigChange::LineColour(self.line_colour),
            ConfigChange::BackgroundColour(self.background_colour),
            ConfigChange::DedupPairs(self.dedup_pairs),
            ConfigChange::Seed(self.seed),
        ]
    }

    /// The changes needed to turn this config's parameters into `other`'s. The viewport and
    /// pause state aren't parameters, they're driven by the host, so they're ignored.
    #[inline]
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<ConfigChange> {
        self.as_changes()
            .into_iter()
            .zip(other.as_changes())
            .filter_map(|(mine, theirs)| (mine != theirs).then_some(theirs))
            .collect()
    }

    /// Write the new value of a change into the matching field.
    #[inline]
    pub fn set(&mut self, change: &ConfigChange) {
        match change {
            ConfigChange::ParticleCount(value) => self.particle_count = *value,
            ConfigChange::MaxRadius(value) => self.max_radius = *value,
            ConfigChange::MaxDistance(value) => self.max_distance = *value,
            ConfigChange::AccelerationX(value) => self.acceleration_x = *value,
            ConfigChange::VerticalVelocity(value) => self.vertical_velocity = *value,
            ConfigChange::DedupPairs(value) => self.dedup_pairs = *value,
            ConfigChange::Seed(value) => self.seed = *value,
            ConfigChange::ParticleColour(value) => self.particle_colour = *value,
            ConfigChange::LineColour(value) => self.line_colour = *value,
            ConfigChange::BackgroundColour(value) => self.background_colour = *value,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identical_configs_have_no_diff() {
        let config = SimulationConfig::default();
        assert!(config.diff(&config.clone()).is_empty());
    }

    #[test]
    fn diff_only_contains_edited_fields() {
        let config = SimulationConfig::default();
        let mut edited = config.clone();
        edited.particle_count = 7;
        edited.line_colour = crate::colour::WHITE;
        edited.viewport = Viewport::new(10, 10);
        edited.paused = true;

        let changes = config.diff(&edited);
        assert_eq!(
            changes,
            vec![
                ConfigChange::ParticleCount(7),
                ConfigChange::LineColour(crate::colour::WHITE),
            ]
        );
    }

    #[test]
    fn setting_every_diffed_change_converges() {
        let mut config = SimulationConfig::default();
        let mut edited = config.clone();
        edited.max_radius = 9.0;
        edited.vertical_velocity = -1.0;
        edited.seed = Some(3);
        edited.background_colour = crate::colour::WHITE;

        for change in config.diff(&edited) {
            config.set(&change);
        }
        assert_eq!(config, edited);
    }

    #[test]
    fn classifying_changes() {
        assert!(ConfigChange::ParticleCount(1).is_regenerating());
        assert!(ConfigChange::MaxDistance(1.0).is_regenerating());
        assert!(ConfigChange::AccelerationX(1.0).is_regenerating());
        assert!(ConfigChange::VerticalVelocity(1.0).is_regenerating());
        assert!(!ConfigChange::ParticleColour(crate::colour::WHITE).is_regenerating());
        assert!(!ConfigChange::LineColour(crate::colour::WHITE).is_regenerating());
        assert!(!ConfigChange::BackgroundColour(crate::colour::WHITE).is_regenerating());
    }

    #[test]
    fn non_finite_values_are_refused() {
        assert!(ConfigChange::MaxDistance(f32::NAN).validate().is_err());
        assert!(ConfigChange::AccelerationX(f32::INFINITY).validate().is_err());
        assert!(ConfigChange::VerticalVelocity(f32::NEG_INFINITY).validate().is_err());
        assert!(ConfigChange::LineColour((0.0, f32::NAN, 0.0, 1.0))
            .validate()
            .is_err());
    }

    #[test]
    fn negative_radius_is_refused_but_negative_distance_is_not() {
        assert!(ConfigChange::MaxRadius(-1.0).validate().is_err());
        assert!(ConfigChange::MaxDistance(-1.0).validate().is_ok());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }
}
