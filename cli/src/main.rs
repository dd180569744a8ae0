use capro_common::Result;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{clear_execute, serve_execute, stats_execute, ServeArgs};

#[derive(Parser)]
#[command(name = "capro")]
#[command(about = "Caching proxy server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Clear the local cache and exit
    #[arg(long, default_value = "false")]
    clear_cache: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    verbose: bool,

    /// Config file (defaults to capro.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy server (same as running without a subcommand)
    Serve(ServeArgs),

    /// Show cache statistics
    Stats {
        /// Cache file to inspect
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },
}

impl Cli {
    /// Rejects top-level flags that a subcommand would otherwise ignore.
    fn check_subcommand_conflicts(self) -> std::result::Result<Self, clap::Error> {
        if self.command.is_none() {
            return Ok(self);
        }

        let conflict = if self.clear_cache {
            Some("--clear-cache cannot be combined with a subcommand")
        } else if self.serve.is_set() {
            Some("server flags given before a subcommand are not applied; pass them after it")
        } else {
            None
        };

        match conflict {
            Some(message) => Err(Cli::command().error(ErrorKind::ArgumentConflict, message)),
            None => Ok(self),
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,capro={level},capro_proxy={level},capro_common={level}"))
    });

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse().check_subcommand_conflicts().unwrap_or_else(|e| e.exit());

    init_logging(cli.verbose);
    debug!("Starting capro CLI");

    let file_config = config::load_file_config(cli.config.as_deref()).await?;

    match cli.command {
        Some(Commands::Serve(args)) => {
            serve_execute(config::resolve(file_config, &args)?).await?;
        }
        Some(Commands::Stats { cache_file }) => {
            stats_execute(config::cache_file(&file_config, cache_file)).await?;
        }
        None if cli.clear_cache => {
            clear_execute(config::cache_file(&file_config, cli.serve.cache_file)).await?;
        }
        None => {
            serve_execute(config::resolve(file_config, &cli.serve)?).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(args).and_then(Cli::check_subcommand_conflicts)
    }

    #[test]
    fn clear_cache_alone_runs_without_subcommand() {
        let cli = parse(&["capro", "--clear-cache"]).unwrap();

        assert!(cli.clear_cache);
        assert!(cli.command.is_none());
    }

    #[test]
    fn clear_cache_with_serve_is_rejected() {
        let err = parse(&["capro", "--clear-cache", "serve"]).err().unwrap();

        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn server_flags_before_subcommand_are_rejected() {
        let err = parse(&["capro", "--port", "9000", "serve"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = parse(&["capro", "--origin", "http://localhost:4000", "stats"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn server_flags_after_serve_are_applied() {
        let cli = parse(&["capro", "serve", "--port", "9000", "--timeout", "5s"]).unwrap();

        match cli.command {
            Some(Commands::Serve(args)) => {
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.timeout, Some(Duration::from_secs(5)));
            }
            _ => panic!("expected serve subcommand"),
        }
    }

    #[test]
    fn root_server_flags_without_subcommand_are_applied() {
        let cli = parse(&["capro", "-p", "9000", "--origin", "http://localhost:4000"]).unwrap();

        assert!(cli.command.is_none());
        assert_eq!(cli.serve.port, Some(9000));
        assert_eq!(cli.serve.origin.as_deref(), Some("http://localhost:4000"));
    }

    #[test]
    fn global_flags_are_allowed_before_subcommand() {
        let cli = parse(&["capro", "--verbose", "--config", "other.toml", "serve"]).unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
        assert!(matches!(cli.command, Some(Commands::Serve(_))));
    }

    #[test]
    fn malformed_timeout_is_a_parse_error() {
        let err = parse(&["capro", "--timeout", "soon"]).err().unwrap();

        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
