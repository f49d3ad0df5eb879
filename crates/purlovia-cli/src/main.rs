//! `purlovia` command-line entry point.
//!
//! Thin wrapper over the purlovia libraries: parses arguments, initialises
//! logging and dispatches to one handler per subcommand. Every handler
//! prints its result to stdout as JSON; logs go to stderr.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::{AssetCommand, ContainerCommand, ModCommand};

#[derive(Parser, Debug)]
#[command(
    name = "purlovia",
    about = "Inspect ARK game assets, workshop mod packages and compressed containers",
    version,
    long_about = "Resolves asset names, loads and links asset packages, walks class \
                  hierarchies and unpacks the chunked zlib containers mods are \
                  distributed in."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Overrides RUST_LOG
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format
    #[arg(long, value_enum, global = true, default_value = "text")]
    log_format: LogFormat,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Container(ContainerCommand),

    #[command(flatten)]
    Mod(ModCommand),

    #[command(flatten)]
    Asset(AssetCommand),
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let output = commands::Output::new(cli.compact);
    match cli.command {
        Commands::Container(cmd) => commands::container::handle(cmd, output),
        Commands::Mod(cmd) => commands::mods::handle(cmd, output),
        Commands::Asset(cmd) => commands::assets::handle(cmd, output),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pack() {
        let cli = Cli::try_parse_from([
            "purlovia",
            "-vv",
            "pack",
            "in.bin",
            "out.z",
            "--chunk-size",
            "65536",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Container(ContainerCommand::Pack { chunk_size, .. }) => {
                assert_eq!(chunk_size, 65536);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_find_with_mods() {
        let cli = Cli::try_parse_from([
            "purlovia",
            "find",
            "/Game/Mods/Ebenus/",
            "--root",
            "/srv/ark/ShooterGame",
            "--mod",
            "Ebenus=1333609359",
            "--exclude",
            ".*_Old",
        ])
        .unwrap();
        match cli.command {
            Commands::Asset(AssetCommand::Find { loader, exclude, .. }) => {
                assert_eq!(loader.mods, vec![("Ebenus".to_string(), "1333609359".to_string())]);
                assert_eq!(exclude, vec![".*_Old".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_mod_pair() {
        let err = Cli::try_parse_from(["purlovia", "asset", "/Game/X", "--mod", "Ebenus"]);
        assert!(err.is_err());
    }
}
