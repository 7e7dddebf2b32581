//! Turn parsed input events into keybinding actions.

use std::sync::Arc;

use color_eyre::eyre::Result;

use crate::config::input::{KeybindingAction, KeybindingsAsEvents};
use crate::shared_state::SharedState;

/// Listens for input and broadcasts any keybindings that it matches.
pub(crate) struct InputHandler {
    /// Shared app state
    state: Arc<SharedState>,
}

impl InputHandler {
    /// Start the input handling task.
    pub fn start(state: Arc<SharedState>) -> tokio::task::JoinHandle<Result<()>> {
        let protocol_rx = state.protocol_tx.subscribe();
        tokio::spawn(async move {
            let handler = Self {
                state: Arc::clone(&state),
            };
            let result = handler.run(protocol_rx).await;
            if let Err(error) = result {
                crate::run::broadcast_protocol_end(&state.protocol_tx);
                return Err(error);
            }
            Ok(())
        })
    }

    /// The main loop.
    async fn run(
        &self,
        mut protocol_rx: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
    ) -> Result<()> {
        loop {
            let message = match protocol_rx.recv().await {
                Ok(message) => message,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Input handler lagged behind by {skipped} messages");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            #[expect(clippy::wildcard_enum_match_arm, reason = "It's our internal protocol")]
            match message {
                crate::run::Protocol::End => break,
                crate::run::Protocol::Input(input) => self.handle_input(&input.event).await,
                _ => (),
            }
        }

        tracing::debug!("Leaving input handler loop");
        Ok(())
    }

    /// Broadcast the action for the input event, if there is one.
    async fn handle_input(&self, event: &termwiz::input::InputEvent) {
        let keybindings = self.state.keybindings.read().await;
        let Some(action) = Self::match_keybinding(&keybindings, event) else {
            return;
        };
        drop(keybindings);

        tracing::debug!("Keybinding triggered: {action:?}");
        let result = self
            .state
            .protocol_tx
            .send(crate::run::Protocol::KeybindEvent(action));
        if let Err(error) = result {
            tracing::error!("Couldn't send keybinding event: {error:?}");
        }

        if action == KeybindingAction::Quit {
            crate::run::broadcast_protocol_end(&self.state.protocol_tx);
        }
    }

    /// Find the action that an input event triggers. `CTRL+C` always quits, whatever the config
    /// says.
    pub fn match_keybinding(
        keybindings: &KeybindingsAsEvents,
        event: &termwiz::input::InputEvent,
    ) -> Option<KeybindingAction> {
        let termwiz::input::InputEvent::Key(key_event) = event else {
            return None;
        };

        let is_ctrl_c = key_event.modifiers == termwiz::input::Modifiers::CTRL
            && matches!(
                key_event.key,
                termwiz::input::KeyCode::Char('c' | 'C' | '\u{3}')
            );
        if is_ctrl_c {
            return Some(KeybindingAction::Quit);
        }

        KeybindingAction::ALL
            .into_iter()
            .find(|action| keybindings.get(action) == Some(key_event))
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::unreachable,
    clippy::wildcard_enum_match_arm,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    fn key(character: char, modifiers: termwiz::input::Modifiers) -> termwiz::input::InputEvent {
        termwiz::input::InputEvent::Key(termwiz::input::KeyEvent {
            key: termwiz::input::KeyCode::Char(character),
            modifiers,
        })
    }

    fn keybindings() -> KeybindingsAsEvents {
        let mut keybindings = KeybindingsAsEvents::new();
        for (action, character) in [
            (KeybindingAction::TogglePause, ' '),
            (KeybindingAction::Redraw, 'r'),
            (KeybindingAction::ToggleMenu, 'm'),
            (KeybindingAction::Quit, 'q'),
        ] {
            let termwiz::input::InputEvent::Key(event) =
                key(character, termwiz::input::Modifiers::NONE)
            else {
                unreachable!();
            };
            keybindings.insert(action, event);
        }
        keybindings
    }

    #[test]
    fn matches_configured_keys() {
        let keybindings = keybindings();
        let none = termwiz::input::Modifiers::NONE;
        assert_eq!(
            InputHandler::match_keybinding(&keybindings, &key(' ', none)),
            Some(KeybindingAction::TogglePause)
        );
        assert_eq!(
            InputHandler::match_keybinding(&keybindings, &key('r', none)),
            Some(KeybindingAction::Redraw)
        );
        assert_eq!(
            InputHandler::match_keybinding(&keybindings, &key('m', none)),
            Some(KeybindingAction::ToggleMenu)
        );
        assert_eq!(
            InputHandler::match_keybinding(&keybindings, &key('x', none)),
            None
        );
    }

    #[test]
    fn modifiers_must_match_too() {
        let keybindings = keybindings();
        assert_eq!(
            InputHandler::match_keybinding(
                &keybindings,
                &key('r', termwiz::input::Modifiers::ALT)
            ),
            None
        );
    }

    #[test]
    fn ctrl_c_always_quits() {
        let keybindings = KeybindingsAsEvents::new();
        assert_eq!(
            InputHandler::match_keybinding(
                &keybindings,
                &key('c', termwiz::input::Modifiers::CTRL)
            ),
            Some(KeybindingAction::Quit)
        );
    }

    #[test]
    fn non_key_events_are_ignored() {
        let event = termwiz::input::InputEvent::Paste("r".to_owned());
        assert_eq!(InputHandler::match_keybinding(&keybindings(), &event), None);
    }

    #[tokio::test]
    async fn quitting_broadcasts_end() {
        let state = SharedState::init();
        *state.keybindings.write().await = keybindings();
        let mut protocol_rx = state.protocol_tx.subscribe();
        let handle = InputHandler::start(Arc::clone(&state));

        let input = crate::raw_input::ParsedInput {
            event: key('q', termwiz::input::Modifiers::NONE),
        };
        state
            .protocol_tx
            .send(crate::run::Protocol::Input(input))
            .unwrap();

        let mut seen_quit = false;
        loop {
            match protocol_rx.recv().await.unwrap() {
                crate::run::Protocol::KeybindEvent(KeybindingAction::Quit) => seen_quit = true,
                crate::run::Protocol::End => break,
                _ => (),
            }
        }
        assert!(seen_quit);
        handle.await.unwrap().unwrap();
    }
}
