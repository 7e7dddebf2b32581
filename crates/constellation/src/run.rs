//! Main entrypoint for running Constellation

use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::cli_args::CliArgs;
use crate::shared_state::SharedState;

/// Updates for the renderer. Every layer is identified by its surface's ID, and the renderer
/// keeps the latest frame for each one.
pub(crate) enum FrameUpdate {
    /// A new frame for a layer
    Layer(crate::surface::Surface),
    /// Stop rendering the layer with the given ID
    RemoveLayer(String),
}

/// Commands to control the various tasks/threads
#[non_exhaustive]
#[derive(Clone, Debug)]
pub(crate) enum Protocol {
    /// The entire application is exiting.
    End,
    /// User's TTY is resized.
    Resize {
        /// Width of new terminal.
        width: u16,
        /// Height of new terminal.
        height: u16,
    },
    /// Parsed input from STDIN.
    Input(crate::raw_input::ParsedInput),
    /// The config file was successfully reloaded.
    Config(crate::config::main::Config),
    /// A known user-defined keybinding event was triggered.
    KeybindEvent(crate::config::input::KeybindingAction),
    /// A short message for the user, shown in the menu.
    Status(String),
}

/// Main entrypoint
pub(crate) async fn run(state_arc: &std::sync::Arc<SharedState>) -> Result<()> {
    let protocol_tx = state_arc.protocol_tx.clone();
    let cli_args = setup(state_arc).await?;

    let (frames_tx, frames_rx) = tokio::sync::mpsc::channel(16);
    let renderer =
        crate::renderer::Renderer::start(Arc::clone(state_arc), frames_rx, protocol_tx.clone());
    let config_handle = crate::config::main::Config::watch(Arc::clone(state_arc));
    let input_thread_handle = crate::raw_input::RawInput::start(protocol_tx.clone());
    let input_handler = crate::input_handler::InputHandler::start(Arc::clone(state_arc));

    override_on_panic_behaviour();
    let menu = crate::menu::Menu::start(Arc::clone(state_arc), frames_tx.clone());
    let animator =
        crate::animator::Animator::start(Arc::clone(state_arc), frames_tx, cli_args.paused);

    let animator_result = animator.await;
    tracing::debug!("Animator finished, exiting Constellation...");
    broadcast_protocol_end(&protocol_tx);

    renderer.await??;
    menu.await??;
    input_handler.await??;
    config_handle.await??;
    if input_thread_handle.is_finished() {
        // The STDIN loop blocks on reading, so it can't listen for the protocol's `End`. We only
        // join it if it finished on its own.
        input_thread_handle
            .join()
            .map_err(|err| color_eyre::eyre::eyre!("STDIN handle: {err:?}"))??;
    }
    animator_result??;

    tracing::trace!("Leaving Constellation's main `run()` function");
    Ok(())
}

/// The default behaviour prints all panics to the CLI, which would scribble over the user's
/// terminal whilst it's in raw mode. So we log them instead.
fn override_on_panic_behaviour() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<String>() {
            message
        } else if let Some(message) = info.payload().downcast_ref::<&str>() {
            message
        } else {
            "Caught a panic with an unknown type."
        };
        let location = match info.location() {
            Some(location) => format!(
                "{}@{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => "Unknown location".to_owned(),
        };
        tracing::error!("Caught panic ({}): {message:?}", location);
    }));
}

/// Signal all task/thread loops to exit.
///
/// It has its own function because the error needs handling separately. If it were bubbled with
/// `?` as usual, there's a chance it would never be logged, because the `End` signal is itself
/// what allows the central error handler to be reached.
pub(crate) fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Prepare the application to start.
async fn setup(state: &std::sync::Arc<SharedState>) -> Result<CliArgs> {
    let cli_args = CliArgs::parse();

    let mut main_config_file = state.main_config_file.write().await;
    (*main_config_file).clone_from(&cli_args.main_config);
    drop(main_config_file);

    *state.seed_override.write().await = cli_args.seed;

    let directory_result =
        crate::config::main::Config::setup_directory(cli_args.config_dir.clone(), state).await;
    if let Err(directory_error) = directory_result {
        color_eyre::eyre::bail!("Error setting up config directory: {directory_error:?}");
    }

    let config_result = crate::config::main::Config::load_config_into_shared_state(state).await;
    if let Err(config_error) = config_result {
        let path = crate::config::main::Config::main_config_path(state).await;
        color_eyre::eyre::bail!(
            "Bad config file: {config_error:?}\n\nConfig path: {}",
            path.display()
        );
    }

    setup_logging(cli_args.clone(), state).await?;

    tracing::info!("Starting Constellation");
    tracing::debug!("Loaded config: {:?}", state.config.read().await);

    let tty_size = crate::renderer::Renderer::get_users_tty_size()?;
    state
        .set_tty_size(tty_size.cols.try_into()?, tty_size.rows.try_into()?)
        .await;
    state.set_is_paused(cli_args.paused).await;

    Ok(cli_args)
}

/// Setup logging
async fn setup_logging(cli_args: CliArgs, state: &std::sync::Arc<SharedState>) -> Result<()> {
    let are_log_filters_manually_set = std::env::var("CONSTELLATION_LOG").is_ok();
    let mut path = state.config.read().await.log_path.clone();

    if let Some(cli_override_path) = cli_args.log_path {
        path = cli_override_path;
    }

    let mut level = state.config.read().await.log_level.clone();
    if let Some(cli_override_level) = cli_args.log_level {
        level = cli_override_level;
    }
    let level_as_string = format!("{level:?}").to_lowercase();

    let is_loggable =
        !matches!(level, crate::config::main::LogLevel::Off) || are_log_filters_manually_set;

    if !is_loggable {
        return Ok(());
    }

    let directory = path.parent().context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(path.clone())?;

    let filters = if are_log_filters_manually_set {
        if let Ok(user_filters) = std::env::var("CONSTELLATION_LOG") {
            std::env::set_var("RUST_LOG", user_filters);
        }

        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .from_env_lossy()
            .add_directive(format!("constellation={level_as_string}").parse()?)
            .add_directive(format!("constellation_core={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(filters);

    tracing_subscriber::registry().with(logfile_layer).init();

    let mut is_logging = state.is_logging.write().await;
    *is_logging = true;
    drop(is_logging);

    // Keep the path that's actually in use, so that it can be reported on exit.
    state.config.write().await.log_path = path;

    Ok(())
}
