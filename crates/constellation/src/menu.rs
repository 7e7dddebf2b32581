//! A small overlay listing the keybindings and current settings, plus a status line for short
//! messages like config errors.

use std::sync::Arc;

use color_eyre::eyre::Result;
use constellation_core::Colour;

use crate::config::input::{describe_key_event, KeybindingAction, KeybindingsAsEvents};
use crate::config::main::SimulationSettings;
use crate::layer::Layer;
use crate::shared_state::SharedState;

/// The ID of the menu's layer.
const ID: &str = "menu";

/// The menu is always rendered above everything else.
const LAYER: i16 = 100;

/// How long a status message stays on screen.
const STATUS_DURATION: std::time::Duration = std::time::Duration::from_secs(3);

/// Background colour of the menu panel and status line.
const PANEL_COLOUR: Colour = (0.08, 0.08, 0.14, 1.0);

/// `Menu`
pub(crate) struct Menu {
    /// The base layer
    layer: Layer,
    /// Shared app state
    state: Arc<SharedState>,
    /// Whether the panel is showing
    is_visible: bool,
    /// The latest status message and when it arrived
    status: Option<(String, std::time::Instant)>,
    /// Whether something changed since the last render
    is_dirty: bool,
}

impl Menu {
    /// Instantiate
    async fn new(
        output_channel: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
        state: Arc<SharedState>,
    ) -> Self {
        let tty_size = state.get_tty_size().await;
        let frame_rate = state.config.read().await.frame_rate;
        Self {
            layer: Layer::new(ID, LAYER, output_channel, tty_size, frame_rate),
            state,
            is_visible: false,
            status: None,
            is_dirty: false,
        }
    }

    /// Our main entrypoint.
    pub(crate) fn start(
        state: Arc<SharedState>,
        output: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = state.protocol_tx.subscribe();
        tokio::spawn(async move {
            let result = Self::run(output, Arc::clone(&state), protocol_rx).await;
            if let Err(error) = result {
                tracing::error!("Menu error: {error:?}");
                crate::run::broadcast_protocol_end(&state.protocol_tx);
                return Err(error);
            }

            Ok(())
        })
    }

    /// The menu's main loop.
    async fn run(
        output: tokio::sync::mpsc::Sender<crate::run::FrameUpdate>,
        state: Arc<SharedState>,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
    ) -> Result<()> {
        let mut menu = Self::new(output, state).await;

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                () = menu.layer.sleep_until_next_frame_tick() => {
                    menu.expire_status();
                    if menu.is_dirty {
                        menu.render().await?;
                    }
                },
                result = protocol_rx.recv() => {
                    match result {
                        Ok(crate::run::Protocol::End) => break,
                        Ok(message) => menu.handle_protocol_message(&message),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Menu lagged behind by {skipped} messages");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        tracing::debug!("Leaving menu loop");
        Ok(())
    }

    /// Handle messages from the rest of the app.
    fn handle_protocol_message(&mut self, message: &crate::run::Protocol) {
        self.layer.handle_common_protocol_messages(message);

        #[expect(
            clippy::wildcard_enum_match_arm,
            reason = "We only need to react to a few messages"
        )]
        match message {
            crate::run::Protocol::KeybindEvent(KeybindingAction::ToggleMenu) => {
                self.is_visible = !self.is_visible;
                self.is_dirty = true;
            }
            crate::run::Protocol::Status(message) => {
                self.status = Some((message.clone(), std::time::Instant::now()));
                self.is_dirty = true;
            }
            crate::run::Protocol::Resize { .. } | crate::run::Protocol::Config(_) => {
                self.is_dirty = true;
            }
            _ => (),
        }
    }

    /// Forget the status message once it's been shown for long enough.
    fn expire_status(&mut self) {
        let is_expired = self
            .status
            .as_ref()
            .is_some_and(|(_, arrived)| arrived.elapsed() >= STATUS_DURATION);
        if is_expired {
            self.status = None;
            self.is_dirty = true;
        }
    }

    /// Send the menu to the renderer, or ask for it to be removed when there's nothing to show.
    async fn render(&mut self) -> Result<()> {
        self.is_dirty = false;
        if !self.layer.is_ready() {
            return Ok(());
        }

        if !self.is_visible && self.status.is_none() {
            return self.layer.send_removal().await;
        }

        let width = usize::from(self.layer.width);
        let height = usize::from(self.layer.height);
        let mut surface = crate::surface::Surface::new(self.layer.id.clone(), width, height, LAYER);

        if self.is_visible {
            let settings = self.state.config.read().await.simulation.clone();
            let keybindings = self.state.keybindings.read().await.clone();
            let is_paused = self.state.get_is_paused().await;
            let lines = panel_lines(&settings, &keybindings, is_paused);
            let panel_width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
            for (y, line) in lines.into_iter().take(height.saturating_sub(2)).enumerate() {
                surface.add_text(
                    1,
                    y + 1,
                    format!(" {line:<panel_width$} "),
                    Some(PANEL_COLOUR),
                    None,
                );
            }
        }

        if let Some((status, _)) = &self.status {
            surface.add_text(
                0,
                height.saturating_sub(1),
                format!(" {status} "),
                Some(PANEL_COLOUR),
                None,
            );
        }

        self.layer.send_output(surface).await
    }
}

/// The text of the menu panel, one entry per line.
fn panel_lines(
    settings: &SimulationSettings,
    keybindings: &KeybindingsAsEvents,
    is_paused: bool,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Constellation ({})",
            if is_paused { "paused" } else { "running" }
        ),
        String::new(),
    ];

    for action in KeybindingAction::ALL {
        let key = keybindings
            .get(&action)
            .map_or_else(|| "unbound".to_owned(), describe_key_event);
        lines.push(format!("{key:<8} {}", action.describe()));
    }

    lines.push(String::new());
    lines.push(format!("particles     {}", settings.particle_count));
    lines.push(format!("max radius    {}", settings.max_radius));
    lines.push(format!("max distance  {}", settings.max_distance));
    lines.push(format!("acceleration  {}", settings.acceleration_x));
    lines.push(format!("vertical      {}", settings.vertical_velocity));
    lines.push(format!("particle      {}", settings.particle_colour));
    lines.push(format!("line          {}", settings.line_colour));
    lines.push(format!("background    {}", settings.background_colour));
    lines.push(format!("dedup pairs   {}", settings.dedup_pairs));
    lines.push(format!(
        "seed          {}",
        settings
            .seed
            .map_or_else(|| "random".to_owned(), |seed| seed.to_string())
    ));

    lines
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;
    use crate::run::{FrameUpdate, Protocol};

    fn keybindings() -> KeybindingsAsEvents {
        let mut keybindings = KeybindingsAsEvents::new();
        keybindings.insert(
            KeybindingAction::TogglePause,
            termwiz::input::KeyEvent {
                key: termwiz::input::KeyCode::Char(' '),
                modifiers: termwiz::input::Modifiers::NONE,
            },
        );
        keybindings.insert(
            KeybindingAction::Quit,
            termwiz::input::KeyEvent {
                key: termwiz::input::KeyCode::Char('q'),
                modifiers: termwiz::input::Modifiers::NONE,
            },
        );
        keybindings
    }

    async fn setup() -> (Menu, tokio::sync::mpsc::Receiver<FrameUpdate>) {
        let state = SharedState::init();
        state.set_tty_size(40, 30).await;
        let (frames_tx, frames_rx) = tokio::sync::mpsc::channel(16);
        (Menu::new(frames_tx, state).await, frames_rx)
    }

    fn row_text(surface: &mut crate::surface::Surface, row: usize) -> String {
        surface.surface.screen_lines()[row].as_str().to_string()
    }

    #[test]
    fn panel_lists_keybindings_in_order() {
        let lines = panel_lines(&SimulationSettings::default(), &keybindings(), false);
        assert_eq!(lines[0], "Constellation (running)");
        assert_eq!(lines[2], "space    pause/resume");
        assert_eq!(lines[3], "unbound  clear trails");
        assert_eq!(lines[5], "q        quit");
    }

    #[test]
    fn panel_shows_settings_and_pause_state() {
        let settings = SimulationSettings {
            seed: Some(7),
            ..SimulationSettings::default()
        };
        let lines = panel_lines(&settings, &keybindings(), true);
        assert_eq!(lines[0], "Constellation (paused)");
        assert!(lines.contains(&"particles     60".to_owned()));
        assert!(lines.contains(&"seed          7".to_owned()));
    }

    #[tokio::test]
    async fn toggling_shows_then_removes_the_menu() {
        let (mut menu, mut frames_rx) = setup().await;

        menu.handle_protocol_message(&Protocol::KeybindEvent(KeybindingAction::ToggleMenu));
        assert!(menu.is_dirty);
        menu.render().await.unwrap();
        match frames_rx.try_recv().unwrap() {
            FrameUpdate::Layer(mut surface) => {
                assert_eq!(surface.layer, 100);
                assert!(row_text(&mut surface, 1).contains("Constellation (running)"));
            }
            FrameUpdate::RemoveLayer(_) => panic!("Menu should be showing"),
        }

        menu.handle_protocol_message(&Protocol::KeybindEvent(KeybindingAction::ToggleMenu));
        menu.render().await.unwrap();
        match frames_rx.try_recv().unwrap() {
            FrameUpdate::RemoveLayer(id) => assert_eq!(id, "menu"),
            FrameUpdate::Layer(_) => panic!("Menu should be hidden"),
        }
    }

    #[tokio::test]
    async fn status_messages_show_on_the_bottom_row() {
        let (mut menu, mut frames_rx) = setup().await;

        menu.handle_protocol_message(&Protocol::Status("Config reloaded".to_owned()));
        menu.render().await.unwrap();
        match frames_rx.try_recv().unwrap() {
            FrameUpdate::Layer(mut surface) => {
                assert!(row_text(&mut surface, 29).starts_with(" Config reloaded "));
                assert!(!row_text(&mut surface, 1).contains("Constellation"));
            }
            FrameUpdate::RemoveLayer(_) => panic!("Status should be showing"),
        }
    }

    #[tokio::test]
    async fn status_messages_expire() {
        let (mut menu, _frames_rx) = setup().await;
        menu.status = Some((
            "Paused".to_owned(),
            std::time::Instant::now()
                .checked_sub(STATUS_DURATION)
                .unwrap(),
        ));
        menu.is_dirty = false;

        menu.expire_status();
        assert!(menu.status.is_none());
        assert!(menu.is_dirty);
    }

    #[tokio::test]
    async fn other_keybindings_are_ignored() {
        let (mut menu, _frames_rx) = setup().await;
        menu.handle_protocol_message(&Protocol::KeybindEvent(KeybindingAction::Redraw));
        assert!(!menu.is_visible);
        assert!(!menu.is_dirty);
    }
}
