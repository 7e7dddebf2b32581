//! All of the user config for Constellation.

use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;
use constellation_core::{ConfigChange, SimulationConfig};

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start Constellation.
static DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Config {
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Keybindings
    pub keybindings: super::input::KeybindingsRaw,
    /// Target frame rate
    pub frame_rate: u32,
    /// The particles and their lines
    pub simulation: SimulationSettings,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory
            .join("constellation")
            .join("constellation.log");

        Self {
            log_level: LogLevel::Off,
            log_path,
            frame_rate: 30,
            keybindings: super::input::KeybindingsRaw::new(),
            simulation: SimulationSettings::default(),
        }
    }
}

/// The `[simulation]` table. It's the same as the simulation's own config, except colours are
/// still the strings that the user typed.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct SimulationSettings {
    /// Number of particles
    pub particle_count: usize,
    /// Particle radii are somewhere below this
    pub max_radius: f32,
    /// Particles closer than this are joined by a line
    pub max_distance: f32,
    /// Horizontal speed for every unit of radius
    pub acceleration_x: f32,
    /// Vertical speed of every particle
    pub vertical_velocity: f32,
    /// Fill colour of particles
    pub particle_colour: String,
    /// Colour of the lines between particles
    pub line_colour: String,
    /// The colour painted under everything
    pub background_colour: String,
    /// Only draw each line once
    pub dedup_pairs: bool,
    /// Fixes the random layout of particles
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            particle_count: defaults.particle_count,
            max_radius: defaults.max_radius,
            max_distance: defaults.max_distance,
            acceleration_x: defaults.acceleration_x,
            vertical_velocity: defaults.vertical_velocity,
            particle_colour: "rgba(255, 255, 255, .5)".to_owned(),
            line_colour: "rgba(120, 160, 255, .1)".to_owned(),
            background_colour: "#000000".to_owned(),
            dedup_pairs: defaults.dedup_pairs,
            seed: defaults.seed,
        }
    }
}

impl SimulationSettings {
    /// Parse the colours and check that every value is usable. The viewport and pause state are
    /// left at their defaults, they don't come from the config file.
    pub fn to_simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = SimulationConfig::default();
        let changes = [
            ConfigChange::ParticleCount(self.particle_count),
            ConfigChange::MaxRadius(self.max_radius),
            ConfigChange::MaxDistance(self.max_distance),
            ConfigChange::AccelerationX(self.acceleration_x),
            ConfigChange::VerticalVelocity(self.vertical_velocity),
            ConfigChange::ParticleColour(constellation_core::colour::parse(
                &self.particle_colour,
            )?),
            ConfigChange::LineColour(constellation_core::colour::parse(&self.line_colour)?),
            ConfigChange::BackgroundColour(constellation_core::colour::parse(
                &self.background_colour,
            )?),
            ConfigChange::DedupPairs(self.dedup_pairs),
            ConfigChange::Seed(self.seed),
        ];
        for change in &changes {
            config.set(change);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Canonical path to the config directory.
    pub async fn directory(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        state.config_path.read().await.clone()
    }

    /// Get the stable location of Constellation's config directory on the user's system.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join("constellation"))
    }

    /// Figure out where our config is being stored, and create the directory if needed.
    pub async fn setup_directory(
        maybe_custom_path: Option<std::path::PathBuf>,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<()> {
        let path = match maybe_custom_path {
            None => Self::default_directory()?,
            Some(path_string) => std::path::PathBuf::new().join(path_string),
        };

        std::fs::create_dir_all(path.clone())?;
        *state.config_path.write().await = path;

        Ok(())
    }

    /// Canonical path to the main config file.
    pub async fn main_config_path(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> std::path::PathBuf {
        let directory = Self::directory(state).await;
        let main_config_file = state.main_config_file.read().await.clone();
        directory.join(main_config_file)
    }

    /// Load the main config
    pub async fn load(state: &std::sync::Arc<crate::shared_state::SharedState>) -> Result<Self> {
        let config_path = Self::main_config_path(state).await;
        let config_file_name = config_path
            .file_name()
            .context("Couldn't get file name from config path")?;
        let is_default_config = config_file_name == crate::cli_args::DEFAULT_CONFIG_FILE_NAME;
        if is_default_config && !config_path.exists() {
            tracing::info!("Writing default config to: {config_path:?}");
            std::fs::write(config_path.clone(), DEFAULT_CONFIG)?;
        }

        tracing::info!("(Re)loading the main Constellation config from: {config_path:?}");
        let result = std::fs::read_to_string(config_path.clone());
        match result {
            Ok(data) => {
                tracing::trace!("Using config file:\n{data}");
                let mut config = toml::from_str::<Self>(&data)?;
                if let Some(seed) = *state.seed_override.read().await {
                    config.simulation.seed = Some(seed);
                }
                config.simulation.to_simulation_config()?;
                Self::load_keybindings(state, &config).await?;
                Ok(config)
            }
            Err(err) => {
                tracing::error!("Loading config: {err:?}");
                color_eyre::eyre::bail!(
                    "Couldn't load config at {config_path:?}: {}",
                    err.to_string()
                );
            }
        }
    }

    /// Parse the shipped default config.
    fn parse_default_config() -> Result<Self> {
        Ok(toml::from_str::<Self>(DEFAULT_CONFIG)?)
    }

    /// Load the main config into the shared state. If the config can't be loaded then the shared
    /// state keeps whatever config it already had.
    pub async fn load_config_into_shared_state(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<Self> {
        let new_config = Self::load(state).await?;
        *state.config.write().await = new_config.clone();
        Ok(new_config)
    }

    /// Load all user keybindings, falling back to the defaults for any that aren't set.
    #[expect(clippy::iter_over_hash_type, reason = "The ordering doesn't matter")]
    async fn load_keybindings(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
        user_config: &Self,
    ) -> Result<()> {
        let mut keybindings = crate::config::input::KeybindingsAsEvents::new();

        let defaults = Self::parse_default_config()?;
        for (action, binding_config) in defaults.keybindings {
            let key_event: termwiz::input::KeyEvent = binding_config.try_into()?;
            keybindings.insert(action, key_event);
        }

        tracing::trace!("Loading user-defined keybindings...");
        for (action, binding_config) in user_config.keybindings.clone() {
            tracing::trace!("Keybinding found for '{action:?}': {binding_config:?}");
            let key_event: termwiz::input::KeyEvent = binding_config.try_into()?;
            tracing::debug!("Keybinding parsed for '{action:?}': {key_event:?}");
            keybindings.insert(action, key_event);
        }

        *state.keybindings.write().await = keybindings;
        Ok(())
    }

    /// Watch the config file for any changes and then automatically update the shared state with
    /// the contents of the new config file.
    pub fn watch(
        state: std::sync::Arc<crate::shared_state::SharedState>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let result = Self::watch_without_error_handling(&state).await;
            if let Err(error) = result {
                crate::run::broadcast_protocol_end(&state.protocol_tx);
                return Err(error);
            }
            Ok(())
        })
    }

    /// The config watcher loop.
    async fn watch_without_error_handling(
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) -> Result<()> {
        let path = Self::directory(state).await;
        tracing::debug!("Watching config ({path:?}) for changes.");

        let (config_file_change_tx, mut config_file_change_rx) = tokio::sync::mpsc::channel(1);
        let mut protocol_rx = state.protocol_tx.subscribe();

        let mut debouncer = notify_debouncer_full::new_debouncer(
            std::time::Duration::from_millis(100),
            None,
            move |result: notify_debouncer_full::DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        let send_result = config_file_change_tx.blocking_send(event.clone());
                        if let Err(error) = send_result {
                            tracing::error!("Sending config file watcher notification: {error:?}");
                        }
                    }
                }
                Err(error) => tracing::error!("File watcher: {error:?}"),
            },
        )?;
        debouncer.watch(
            &path,
            notify_debouncer_full::notify::RecursiveMode::NonRecursive,
        )?;

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                Some(event) = config_file_change_rx.recv() => {
                    Self::handle_file_change_event(event, state).await;
                },
                Ok(message) = protocol_rx.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Leaving config watcher loop");
        Ok(())
    }

    /// Handle an event from the config file watcher. Should normally be a notification that the
    /// config file has changed.
    async fn handle_file_change_event(
        event: notify_debouncer_full::DebouncedEvent,
        state: &std::sync::Arc<crate::shared_state::SharedState>,
    ) {
        use notify_debouncer_full::notify::event as notify_event;
        let notify_event::EventKind::Modify(kind) = event.kind else {
            return;
        };
        let notify_event::ModifyKind::Data(_) = kind else {
            return;
        };

        let main_config_path = Self::main_config_path(state).await;
        let is_main_config = event
            .paths
            .iter()
            .any(|path| path.file_name() == main_config_path.file_name());
        if !is_main_config {
            return;
        }

        tracing::debug!(
            "Config file change detected ({:?}), updating shared state.",
            event.paths
        );
        Self::reload(state).await;
    }

    /// Reload the config and tell everyone about it.
    pub async fn reload(state: &std::sync::Arc<crate::shared_state::SharedState>) {
        match Self::load_config_into_shared_state(state).await {
            Ok(config) => {
                state
                    .protocol_tx
                    .send(crate::run::Protocol::Config(config))
                    .unwrap_or_else(|send_error| {
                        tracing::error!(
                            "Couldn't send config update on protocol channel: {send_error:?}"
                        );
                        0
                    });
                state.send_status("Config reloaded");
            }
            Err(error) => {
                tracing::error!("Config reload refused: {error:?}");
                state.send_status(&format!("Config error: {}", error.root_cause()));
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, clippy::panic, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    async fn setup(
        config_file_contents: Option<&str>,
    ) -> (
        std::sync::Arc<crate::shared_state::SharedState>,
        tempfile::TempDir,
    ) {
        let directory = tempfile::tempdir().unwrap();
        let state = crate::shared_state::SharedState::init();
        *state.main_config_file.write().await =
            crate::cli_args::DEFAULT_CONFIG_FILE_NAME.into();
        Config::setup_directory(Some(directory.path().to_path_buf()), &state)
            .await
            .unwrap();
        if let Some(contents) = config_file_contents {
            let path = Config::main_config_path(&state).await;
            std::fs::write(path, contents).unwrap();
        }
        (state, directory)
    }

    #[test]
    fn shipped_default_config_matches_built_in_defaults() {
        let shipped = Config::parse_default_config().unwrap();
        assert_eq!(shipped.simulation, SimulationSettings::default());
        assert_eq!(shipped.frame_rate, 30);
        assert_eq!(
            shipped.simulation.to_simulation_config().unwrap(),
            SimulationSettings::default().to_simulation_config().unwrap()
        );
    }

    #[tokio::test]
    async fn default_config_is_written_on_first_run() {
        let (state, _directory) = setup(None).await;
        let path = Config::main_config_path(&state).await;
        assert!(!path.exists());

        Config::load_config_into_shared_state(&state).await.unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), DEFAULT_CONFIG);
        assert_eq!(state.keybindings.read().await.len(), 4);
    }

    #[tokio::test]
    async fn partial_config_falls_back_to_defaults() {
        let (state, _directory) = setup(Some(
            "
                [simulation]
                particle_count = 5
                line_colour = 'white'
            ",
        ))
        .await;

        let config = Config::load_config_into_shared_state(&state).await.unwrap();

        assert_eq!(config.simulation.particle_count, 5);
        assert_eq!(config.simulation.max_distance, 18.0);
        let simulation = config.simulation.to_simulation_config().unwrap();
        assert_eq!(simulation.line_colour, constellation_core::colour::WHITE);
    }

    #[tokio::test]
    async fn user_keybindings_override_defaults() {
        let (state, _directory) = setup(Some(
            "
                [keybindings]
                quit = { key = 'x', mods = 'CTRL' }
            ",
        ))
        .await;

        Config::load_config_into_shared_state(&state).await.unwrap();

        let keybindings = state.keybindings.read().await;
        let quit = keybindings
            .get(&crate::config::input::KeybindingAction::Quit)
            .unwrap();
        assert_eq!(quit.key, termwiz::input::KeyCode::Char('x'));
        assert_eq!(quit.modifiers, termwiz::input::Modifiers::CTRL);
        let pause = keybindings
            .get(&crate::config::input::KeybindingAction::TogglePause)
            .unwrap();
        assert_eq!(pause.key, termwiz::input::KeyCode::Char(' '));
    }

    #[tokio::test]
    async fn bad_reload_keeps_previous_config() {
        let (state, _directory) = setup(Some(
            "
                [simulation]
                particle_count = 12
            ",
        ))
        .await;
        Config::load_config_into_shared_state(&state).await.unwrap();

        let path = Config::main_config_path(&state).await;
        for bad in [
            "[simulation]\nmax_distance = nan\n",
            "[simulation]\nacceleration_x = inf\n",
            "[simulation]\nmax_radius = -1.0\n",
            "[simulation]\nparticle_count = -3\n",
            "[simulation]\nline_colour = 'not a colour'\n",
        ] {
            std::fs::write(path.clone(), bad).unwrap();
            assert!(Config::load_config_into_shared_state(&state).await.is_err());
            assert_eq!(state.config.read().await.simulation.particle_count, 12);
        }
    }

    #[tokio::test]
    async fn seed_override_survives_reloads() {
        let (state, _directory) = setup(Some(
            "
                [simulation]
                seed = 1
            ",
        ))
        .await;
        *state.seed_override.write().await = Some(99);

        let config = Config::load_config_into_shared_state(&state).await.unwrap();

        assert_eq!(config.simulation.seed, Some(99));
    }

    #[tokio::test]
    async fn reload_broadcasts_config_and_status() {
        let (state, _directory) = setup(None).await;
        let mut protocol_rx = state.protocol_tx.subscribe();

        Config::reload(&state).await;

        assert!(matches!(
            protocol_rx.recv().await.unwrap(),
            crate::run::Protocol::Config(_)
        ));
        match protocol_rx.recv().await.unwrap() {
            crate::run::Protocol::Status(message) => assert_eq!(message, "Config reloaded"),
            other => panic!("Unexpected message: {other:?}"),
        }
    }
}
