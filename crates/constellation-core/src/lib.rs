//! # Constellation Core
//! Bouncing particles inside a rectangular viewport, joined by lines whenever two of them come
//! close enough to each other.
//!
//! Nothing in here knows how pixels actually reach a screen. Everything is drawn through the
//! [`surface::DrawingSurface`] trait, and the surface is never cleared between ticks, so discs and
//! lines pile up into trails. Only resets, background colour changes and explicit redraws paint
//! over the whole viewport.
//!
//! The usual lifecycle is:
//!   1. Build a [`config::SimulationConfig`] and hand it to [`state::SimulationState::new`].
//!   2. Call [`state::SimulationState::reset`] once to fill the background and spawn particles.
//!   3. Call [`state::SimulationState::tick`] at whatever rate the host refreshes.
//!   4. Feed parameter edits through [`state::SimulationState::apply`] and viewport changes
//!      through [`state::SimulationState::resize`], strictly between ticks.

#![expect(clippy::pub_use, reason = "How else are you supposed re-export??")]

pub mod colour;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod integrator;
pub mod particle;
pub mod proximity;
pub mod state;
pub mod surface;
pub mod viewport;

#[cfg(test)]
mod tests {
    pub mod recorder;
}

pub use colour::Colour;
pub use config::{ConfigChange, SimulationConfig};
pub use errors::CoreError;
pub use geometry::Point;
pub use particle::Particle;
pub use state::{SimulationState, TickOutcome};
pub use surface::DrawingSurface;
pub use viewport::Viewport;
