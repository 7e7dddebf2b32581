//! Here we store all the shared data that the app's tasks might use.
//! Access is mediated with locks to support asynchronicity

use std::sync::Arc;

use tokio::sync::RwLock;

/// The size of the user's terminal
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "It's very unlikely that this is going to have any more fields added to it"
)]
pub struct TTYSize {
    /// Width of the TTY
    pub width: u16,
    /// Height of the TTY
    pub height: u16,
}

impl TTYSize {
    /// The size in half-block pixels. Every cell holds 2 pixels, one above the other.
    pub fn as_pixels(self) -> (usize, usize) {
        (usize::from(self.width), usize::from(self.height) * 2)
    }
}

/// All the shared data the app uses
#[non_exhaustive]
pub(crate) struct SharedState {
    /// The channel on which all protocol messages are sent.
    pub protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    /// Location of the config directory.
    pub config_path: RwLock<std::path::PathBuf>,
    /// Name of the main config file.
    pub main_config_file: RwLock<std::path::PathBuf>,
    /// User config
    pub config: RwLock<crate::config::main::Config>,
    /// A seed from the CLI that takes precedence over the config file.
    pub seed_override: RwLock<Option<u64>>,
    /// All the user-configured keybindings.
    pub keybindings: RwLock<crate::config::input::KeybindingsAsEvents>,
    /// Just the size of the user's terminal.
    pub tty_size: RwLock<TTYSize>,
    /// Is the application logging?
    pub is_logging: RwLock<bool>,
    /// Is the simulation paused? Only the animator changes this, it's here for the menu to read.
    pub is_paused: RwLock<bool>,
}

impl SharedState {
    /// Initialise the shared state
    pub fn init() -> Arc<Self> {
        let (protocol_tx, _) = tokio::sync::broadcast::channel(64);
        Arc::new(Self {
            protocol_tx,
            config_path: RwLock::default(),
            main_config_file: RwLock::default(),
            config: RwLock::default(),
            seed_override: RwLock::default(),
            keybindings: RwLock::default(),
            tty_size: RwLock::default(),
            is_logging: RwLock::default(),
            is_paused: RwLock::default(),
        })
    }

    /// Get a read lock and return the current TTY size
    pub async fn get_tty_size(&self) -> TTYSize {
        let tty_size = self.tty_size.read().await;
        *tty_size
    }

    /// Get a write lock and set the a new TTY size
    pub async fn set_tty_size(&self, width: u16, height: u16) {
        let mut tty_size = self.tty_size.write().await;
        *tty_size = TTYSize { width, height };
    }

    /// Get a read lock and return whether the simulation is paused.
    pub async fn get_is_paused(&self) -> bool {
        let is_paused = self.is_paused.read().await;
        *is_paused
    }

    /// Get a write lock and set the pause state.
    pub async fn set_is_paused(&self, value: bool) {
        let mut is_paused = self.is_paused.write().await;
        *is_paused = value;
    }

    /// A convenience function for sending a status message to the menu.
    pub fn send_status(&self, message: &str) {
        self.protocol_tx
            .send(crate::run::Protocol::Status(message.to_owned()))
            .unwrap_or_else(|send_error| {
                tracing::error!("Error sending status message: {send_error:?}");
                0
            });
    }
}
