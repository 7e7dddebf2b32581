//! Runs the particle simulation and sends every frame to the renderer.
//!
//! The canvas is never cleared between frames, so moving particles leave trails behind them.

use std::sync::Arc;

use color_eyre::eyre::Result;
use constellation_core::SimulationState;

use crate::canvas::Canvas;
use crate::config::input::KeybindingAction;
use crate::layer::Layer;
use crate::shared_state::SharedState;

/// The ID of the animator's layer.
const ID: &str = "canvas";

/// The animator is the bottom-most layer.
const LAYER: i16 = 0;

/// `Animator`
pub(crate) struct Animator {
    /// The base layer
    layer: Layer,
    /// Shared app state
    state: Arc<SharedState>,
    /// The particles and the parameters they're made from
    simulation: SimulationState,
    /// Every pixel the simulation has ever painted
    canvas: Canvas,
    /// Whether the canvas changed outside of a tick, so still needs sending even when paused.
    is_dirty: bool,
}

impl Animator {
    /// Instantiate
    async fn new(
        output_channel: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
        state: Arc<SharedState>,
        is_paused: bool,
    ) -> Result<Self> {
        let config = state.config.read().await.clone();
        let tty_size = state.get_tty_size().await;
        let (width, height) = tty_size.as_pixels();

        let mut simulation_config = config.simulation.to_simulation_config()?;
        simulation_config.viewport.set_bounds(width, height);
        let mut simulation = SimulationState::new(simulation_config)?;
        simulation.set_paused(is_paused);

        let mut canvas = Canvas::new(width, height);
        simulation.reset(&mut canvas);

        Ok(Self {
            layer: Layer::new(ID, LAYER, output_channel, tty_size, config.frame_rate),
            state,
            simulation,
            canvas,
            is_dirty: true,
        })
    }

    /// Our main entrypoint.
    pub(crate) fn start(
        state: Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
        is_paused: bool,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = state.protocol_tx.subscribe();
        tokio::spawn(async move {
            let result = Self::run(output, Arc::clone(&state), protocol_rx, is_paused).await;
            if let Err(error) = result {
                tracing::error!("Animator error: {error:?}");
                crate::run::broadcast_protocol_end(&state.protocol_tx);
                return Err(error);
            }

            Ok(())
        })
    }

    /// The animator's main loop.
    async fn run(
        output: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
        state: Arc<SharedState>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        is_paused: bool,
    ) -> Result<()> {
        let mut animator = Self::new(output, state, is_paused).await?;

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                () = animator.layer.sleep_until_next_frame_tick() => {
                    animator.render().await?;
                },
                result = protocol_rx.recv() => {
                    match result {
                        Ok(crate::run::Protocol::End) => break,
                        Ok(message) => animator.handle_protocol_message(message).await,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Animator lagged behind by {skipped} messages");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        tracing::debug!("Leaving animator loop");
        Ok(())
    }

    /// Advance the simulation by a tick and send the canvas if anything changed.
    async fn render(&mut self) -> Result<()> {
        if !self.layer.is_ready() {
            return Ok(());
        }

        let outcome = self.simulation.tick(&mut self.canvas);
        if !outcome.has_drawn() && !self.is_dirty {
            return Ok(());
        }

        let surface = self.canvas.to_surface(&self.layer.id, self.layer.layer)?;
        self.layer.send_output(surface).await?;
        self.is_dirty = false;

        Ok(())
    }

    /// Handle messages from the rest of the app.
    async fn handle_protocol_message(&mut self, message: crate::run::Protocol) {
        self.layer.handle_common_protocol_messages(&message);

        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "We only need to react to a few messages"
        )]
        match message {
            crate::run::Protocol::Resize { width, height } => {
                let (pixels_wide, pixels_high) =
                    crate::shared_state::TTYSize { width, height }.as_pixels();
                if self
                    .simulation
                    .resize(pixels_wide, pixels_high, &mut self.canvas)
                {
                    self.is_dirty = true;
                }
            }
            crate::run::Protocol::Config(config) => {
                self.apply_config(&config.simulation);
            }
            crate::run::Protocol::KeybindEvent(action) => self.handle_keybinding(action).await,
            _ => (),
        }
    }

    /// Apply only the settings that differ from the ones already running.
    fn apply_config(&mut self, settings: &crate::config::main::SimulationSettings) {
        let result = settings.to_simulation_config().and_then(|incoming| {
            let changes = self.simulation.config().diff(&incoming);
            Ok(self.simulation.apply_all(&changes, &mut self.canvas)?)
        });

        match result {
            Ok(was_reset) => {
                tracing::debug!("Applied new simulation settings (reset: {was_reset})");
                self.is_dirty = true;
            }
            Err(error) => {
                tracing::error!("Couldn't apply simulation settings: {error:?}");
                self.state
                    .send_status(&format!("Config error: {}", error.root_cause()));
            }
        }
    }

    /// React to the user's keybindings.
    async fn handle_keybinding(&mut self, action: KeybindingAction) {
        match action {
            KeybindingAction::TogglePause => {
                let is_paused = self.simulation.toggle_pause();
                self.state.set_is_paused(is_paused).await;
                self.state
                    .send_status(if is_paused { "Paused" } else { "Resumed" });
            }
            KeybindingAction::Redraw => {
                self.simulation.redraw(&mut self.canvas);
                self.is_dirty = true;
            }
            KeybindingAction::ToggleMenu | KeybindingAction::Quit => (),
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    clippy::wildcard_enum_match_arm,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;
    use crate::run::{FrameUpdate, Protocol};

    async fn setup(
        is_paused: bool,
    ) -> (
        Animator,
        tokio::sync::mpsc::Receiver<FrameUpdate>,
        Arc<SharedState>,
    ) {
        let state = SharedState::init();
        state.set_tty_size(20, 10).await;
        let (frames_tx, frames_rx) = tokio::sync::mpsc::channel(16);
        let animator = Animator::new(frames_tx, Arc::clone(&state), is_paused)
            .await
            .unwrap();
        (animator, frames_rx, state)
    }

    fn expect_frame(
        frames_rx: &mut tokio::sync::mpsc::Receiver<FrameUpdate>,
    ) -> crate::surface::Surface {
        match frames_rx.try_recv().unwrap() {
            FrameUpdate::Layer(surface) => surface,
            FrameUpdate::RemoveLayer(id) => panic!("Unexpected removal of {id}"),
        }
    }

    #[tokio::test]
    async fn canvas_matches_the_terminal_in_pixels() {
        let (animator, _frames_rx, _state) = setup(false).await;
        assert_eq!(animator.canvas.width(), 20);
        assert_eq!(animator.canvas.height(), 20);
        assert_eq!(animator.simulation.particles().len(), 60);
    }

    #[tokio::test]
    async fn every_tick_sends_a_frame() {
        let (mut animator, mut frames_rx, _state) = setup(false).await;
        animator.render().await.unwrap();
        let surface = expect_frame(&mut frames_rx);
        assert_eq!(surface.id, "canvas");
        assert_eq!((surface.width, surface.height), (20, 10));

        animator.render().await.unwrap();
        expect_frame(&mut frames_rx);
    }

    #[tokio::test]
    async fn paused_animator_only_sends_changes() {
        let (mut animator, mut frames_rx, _state) = setup(true).await;
        let before = animator.simulation.particles().to_vec();

        animator.render().await.unwrap();
        expect_frame(&mut frames_rx);
        animator.render().await.unwrap();
        assert!(frames_rx.try_recv().is_err());
        assert_eq!(animator.simulation.particles(), before.as_slice());

        animator.handle_keybinding(KeybindingAction::Redraw).await;
        animator.render().await.unwrap();
        expect_frame(&mut frames_rx);
    }

    #[tokio::test]
    async fn toggling_pause_is_shared_and_announced() {
        let (mut animator, _frames_rx, state) = setup(false).await;
        let mut protocol_rx = state.protocol_tx.subscribe();

        animator.handle_keybinding(KeybindingAction::TogglePause).await;
        assert!(animator.simulation.is_paused());
        assert!(state.get_is_paused().await);
        match protocol_rx.recv().await.unwrap() {
            Protocol::Status(message) => assert_eq!(message, "Paused"),
            other => panic!("Unexpected message: {other:?}"),
        }

        animator.handle_keybinding(KeybindingAction::TogglePause).await;
        assert!(!state.get_is_paused().await);
        match protocol_rx.recv().await.unwrap() {
            Protocol::Status(message) => assert_eq!(message, "Resumed"),
            other => panic!("Unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resizing_regenerates_the_canvas() {
        let (mut animator, _frames_rx, _state) = setup(false).await;
        animator
            .handle_protocol_message(Protocol::Resize {
                width: 30,
                height: 5,
            })
            .await;

        assert_eq!(animator.canvas.width(), 30);
        assert_eq!(animator.canvas.height(), 10);
        assert_eq!(animator.layer.width, 30);
        assert_eq!(animator.simulation.config().viewport.width, 30);
        assert!(animator.is_dirty);
    }

    #[tokio::test]
    async fn reloaded_config_only_applies_differences() {
        let (mut animator, _frames_rx, state) = setup(false).await;
        let before = animator.simulation.particles().to_vec();

        let mut config = state.config.read().await.clone();
        config.simulation.line_colour = "#ff0000".to_owned();
        animator
            .handle_protocol_message(Protocol::Config(config.clone()))
            .await;
        assert_eq!(animator.simulation.particles(), before.as_slice());
        assert_eq!(
            animator.simulation.config().line_colour,
            (1.0, 0.0, 0.0, 1.0)
        );

        config.simulation.particle_count = 5;
        config.frame_rate = 60;
        animator
            .handle_protocol_message(Protocol::Config(config))
            .await;
        assert_eq!(animator.simulation.particles().len(), 5);
        assert_eq!(animator.layer.frame_rate, 60);
    }

    #[tokio::test]
    async fn unusable_config_is_reported() {
        let (mut animator, _frames_rx, state) = setup(false).await;
        let mut protocol_rx = state.protocol_tx.subscribe();

        let mut config = state.config.read().await.clone();
        config.simulation.background_colour = "not a colour".to_owned();
        animator
            .handle_protocol_message(Protocol::Config(config))
            .await;

        assert_eq!(animator.simulation.particles().len(), 60);
        match protocol_rx.recv().await.unwrap() {
            Protocol::Status(message) => assert!(message.starts_with("Config error")),
            other => panic!("Unexpected message: {other:?}"),
        }
    }
}
