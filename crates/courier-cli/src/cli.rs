//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use courier_common_config::{ConfigLoader, CourierConfig, Environment};
use courier_common_log::{LogConfig, LogLevel};

use crate::commands::{DownloadCommand, GetCommand, PostFormCommand, PostJsonCommand, UploadCommand};
use crate::error::CliError;

/// Courier - retrying HTTP request dispatcher
///
/// Issue requests with automatic retry and backoff.
#[derive(Debug, Parser)]
#[command(
    name = "courier",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "COURIER_CONFIG",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET a URL, optionally with query parameters
    Get(GetCommand),

    /// POST a form, optionally with headers and fields
    PostForm(PostFormCommand),

    /// POST a JSON body
    PostJson(PostJsonCommand),

    /// Upload a file as multipart form data
    Upload(UploadCommand),

    /// Download a URL to a file
    Download(DownloadCommand),
}

impl Cli {
    /// Logging configuration from the environment, adjusted by `-v`/`-q`.
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();

        let env_level = std::env::var("COURIER_LOG_LEVEL").is_ok() || std::env::var("RUST_LOG").is_ok();
        config.level = match (self.quiet, self.verbose) {
            (true, _) => LogLevel::Error,
            (false, 0) if env_level => config.level,
            (false, 0) => LogLevel::Warn,
            (false, 1) => LogLevel::Info,
            (false, 2) => LogLevel::Debug,
            _ => LogLevel::Trace,
        };

        config
    }

    /// Load configuration from `--config`, or `.courier/config.yaml` in the
    /// working directory, then apply environment overrides.
    pub fn load_config(&self) -> Result<CourierConfig, CliError> {
        Environment::init()?;

        let loader = ConfigLoader::new(".");
        let mut config = match &self.config {
            Some(path) => loader.load_file(path)?,
            None => loader.load()?,
        };

        Environment::apply_overrides(&mut config)?;
        loader.validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_post_form() {
        let cli = Cli::try_parse_from([
            "courier",
            "post-form",
            "https://api.example.com/login",
            "-H",
            "x-token=abc",
            "-p",
            "name=neo",
            "-p",
            "pass=red",
        ])
        .unwrap();

        match cli.command {
            Command::PostForm(cmd) => {
                assert_eq!(cmd.headers.len(), 1);
                assert_eq!(cmd.params.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["courier", "-q", "-v", "get", "https://x"]).is_err());
    }

    #[test]
    fn test_verbosity_sets_level() {
        let cli = Cli::try_parse_from(["courier", "-vv", "get", "https://x"]).unwrap();
        assert_eq!(cli.log_config().level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["courier", "-q", "get", "https://x"]).unwrap();
        assert_eq!(cli.log_config().level, LogLevel::Error);
    }

    #[test]
    fn test_download_requires_output() {
        assert!(Cli::try_parse_from(["courier", "download", "https://x/file"]).is_err());
    }
}
