//! ocppmsg - OCPP message inspector
//!
//! Parses, normalizes, signs and verifies OCPP messages and decodes OCPP-J
//! RPC frames from the command line.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use config::Config;
use ocppmsg_protocol::MessageKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocppmsg")]
#[command(about = "Inspect, normalize, sign and verify OCPP messages")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "OCPPMSG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which side of an exchange a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Request,
    Response,
}

impl From<KindArg> for MessageKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Request => MessageKind::Request,
            KindArg::Response => MessageKind::Response,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported actions and their JSON-LD contexts
    Actions,

    /// Parse a message and print its normalized JSON
    Parse {
        /// Action name, e.g. RequestStopTransaction
        #[arg(short, long)]
        action: String,

        /// Message kind
        #[arg(short, long, value_enum, default_value = "request")]
        kind: KindArg,

        /// The request a response answers (JSON or @file.json)
        #[arg(short, long)]
        request: Option<String>,

        /// Emit the JSON-LD @context
        #[arg(long)]
        context: bool,

        /// Message JSON (or @file.json to read from file)
        json: String,
    },

    /// Decode an OCPP-J frame
    Frame {
        /// Frame text (or @file to read from file)
        frame: String,
    },

    /// Sign a message with the configured Ed25519 key
    Sign {
        /// Action name
        #[arg(short, long)]
        action: String,

        /// Message kind
        #[arg(short, long, value_enum, default_value = "request")]
        kind: KindArg,

        /// The request a response answers (JSON or @file.json)
        #[arg(short, long)]
        request: Option<String>,

        /// Hex encoded key seed file, overriding signing.key_file
        #[arg(long)]
        key_file: Option<PathBuf>,

        /// Message JSON (or @file.json to read from file)
        json: String,
    },

    /// Verify every signature of a message
    Verify {
        /// Action name
        #[arg(short, long)]
        action: String,

        /// Message kind
        #[arg(short, long, value_enum, default_value = "request")]
        kind: KindArg,

        /// The request a response answers (JSON or @file.json)
        #[arg(short, long)]
        request: Option<String>,

        /// Message JSON (or @file.json to read from file)
        json: String,
    },

    /// Print the key id and fingerprint of the signing key
    PublicKey {
        /// Hex encoded key seed file, overriding signing.key_file
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match commands::execute(&config, cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
