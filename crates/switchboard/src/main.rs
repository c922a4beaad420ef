// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchboard - WhatsApp inbound routing and agent inbox server.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod agent;
mod doctor;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use switchboard_config::SwitchboardConfig;

/// Switchboard - routes WhatsApp customers to human agents.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve,
    /// Manage agents in the directory.
    Agent {
        #[command(subcommand)]
        action: agent::AgentCommand,
    },
    /// Run diagnostic checks.
    Doctor {
        /// Run intensive checks (integrity check).
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Query a running server's health endpoint.
    Status {
        /// Output structured JSON.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> SwitchboardConfig {
    let loaded = match path {
        Some(path) => switchboard_config::load_and_validate_path(path),
        None => switchboard_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            switchboard_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Agent { action }) => agent::run_agent(&config, action).await,
        Some(Commands::Doctor { deep, plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), deep, plain).await
        }
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        None => {
            println!("switchboard: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc answers epoch/stats queries.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_agent_presence() {
        let cli = Cli::try_parse_from([
            "switchboard",
            "--config",
            "/tmp/sb.toml",
            "agent",
            "presence",
            "a-1",
            "online",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sb.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Agent {
                action: agent::AgentCommand::Presence { .. }
            })
        ));
    }

    #[test]
    fn cli_without_subcommand_is_accepted() {
        let cli = Cli::try_parse_from(["switchboard"]).unwrap();
        assert!(cli.command.is_none());
    }
}
