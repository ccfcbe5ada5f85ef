// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stoa - converse with philosopher personas that remember.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod memory;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use stoa_config::StoaConfig;
use stoa_core::types::ResetScope;

/// Stoa - converse with philosopher personas that remember.
#[derive(Parser, Debug)]
#[command(name = "stoa", version, about, long_about = None)]
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
    /// List the registered personas.
    Personas,
    /// Launch an interactive conversation with a persona.
    Shell {
        /// Persona to talk to first.
        #[arg(long, default_value = "socrates")]
        persona: String,
    },
    /// Clear a persona's memory.
    Reset {
        /// Persona whose memory is cleared.
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        persona: Option<String>,
        /// Reset every registered persona.
        #[arg(long)]
        all: bool,
        /// Which memory to clear: short_term, long_term or both.
        #[arg(long, default_value = "both", value_parser = parse_scope)]
        scope: ResetScope,
    },
    /// Print how many long-term entries a persona holds.
    Count {
        #[arg(long)]
        persona: String,
    },
}

/// Parses a reset scope, accepting `-` as well as `_` separators.
pub(crate) fn parse_scope(s: &str) -> Result<ResetScope, String> {
    s.trim()
        .replace('-', "_")
        .to_lowercase()
        .parse::<ResetScope>()
        .map_err(|_| format!("unknown scope `{s}` (expected short_term, long_term or both)"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let loaded = match &cli.config {
        Some(path) => stoa_config::load_and_validate_path(path),
        None => stoa_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            stoa_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Personas) => {
            print_personas(&config);
            Ok(())
        }
        Some(Commands::Shell { persona }) => shell::run_shell(config, persona).await,
        Some(Commands::Reset {
            persona,
            all,
            scope,
        }) => memory::run_reset(&config, persona.as_deref(), all, scope).await,
        Some(Commands::Count { persona }) => memory::run_count(&config, &persona).await,
        None => {
            println!("stoa: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

fn print_personas(config: &StoaConfig) {
    for persona in &config.personas {
        println!("{:<14} {}", persona.id.bold(), persona.name);
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stoa={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc can advance the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn scope_accepts_both_separators() {
        assert_eq!(parse_scope("short_term").unwrap(), ResetScope::ShortTerm);
        assert_eq!(parse_scope("long-term").unwrap(), ResetScope::LongTerm);
        assert_eq!(parse_scope("Both").unwrap(), ResetScope::Both);
        assert!(parse_scope("everything").is_err());
    }

    #[test]
    fn reset_requires_persona_or_all() {
        assert!(Cli::try_parse_from(["stoa", "reset"]).is_err());
        assert!(Cli::try_parse_from(["stoa", "reset", "--all"]).is_ok());
        assert!(
            Cli::try_parse_from(["stoa", "reset", "--persona", "plato", "--all"]).is_err()
        );
        let cli = Cli::try_parse_from([
            "stoa", "reset", "--persona", "plato", "--scope", "long_term",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Reset { persona, scope, .. }) => {
                assert_eq!(persona.as_deref(), Some("plato"));
                assert_eq!(scope, ResetScope::LongTerm);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
