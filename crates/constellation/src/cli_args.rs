//! All the CLI arguments for Constellation

/// The default name of the main config file.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "constellation.toml";

/// Bouncing particles, joined by lines whenever they get close to each other.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[non_exhaustive]
pub struct CliArgs {
    /// Use a different config directory. Defaults to `$XDG_CONFIG_HOME/constellation`.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,

    /// Name of the main config file inside the config directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    pub main_config: std::path::PathBuf,

    /// Override the log level from the config file.
    #[arg(long, value_enum)]
    pub log_level: Option<crate::config::main::LogLevel>,

    /// Override the log path from the config file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// Start with the simulation paused.
    #[arg(long)]
    pub paused: bool,

    /// Seed the random particle layout, so that it's the same every time.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests aren't so strict")]
mod test {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["constellation"]).unwrap();
        assert_eq!(
            args.main_config,
            std::path::PathBuf::from(DEFAULT_CONFIG_FILE_NAME)
        );
        assert!(!args.paused);
        assert_eq!(args.seed, None);
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn overrides() {
        let args = CliArgs::try_parse_from([
            "constellation",
            "--paused",
            "--seed",
            "42",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(args.paused);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.log_level, Some(crate::config::main::LogLevel::Debug));
    }
}
