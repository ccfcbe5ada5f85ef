// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `stoa shell` command implementation.
//!
//! An interactive REPL with a colored prompt and readline history. Each line
//! is answered by the current persona; slash commands switch personas and
//! manage memory.

use std::sync::Arc;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use stoa_agent::AgentRuntime;
use stoa_anthropic::AnthropicProvider;
use stoa_config::StoaConfig;
use stoa_core::error::StoaError;
use stoa_core::types::ResetScope;

use crate::memory::describe;

/// A line typed at the shell prompt.
#[derive(Debug, PartialEq)]
enum ShellCommand {
    Quit,
    Personas,
    Switch(String),
    Reset(ResetScope),
    Count,
    Help,
    Message(String),
    Empty,
    Invalid(String),
}

fn parse_line(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ShellCommand::Message(trimmed.to_string());
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();
    match (name, arg) {
        ("quit" | "exit", _) => ShellCommand::Quit,
        ("personas", _) => ShellCommand::Personas,
        ("help", _) => ShellCommand::Help,
        ("count", _) => ShellCommand::Count,
        ("persona", Some(id)) => ShellCommand::Switch(id.to_string()),
        ("persona", None) => ShellCommand::Invalid("usage: /persona <id>".into()),
        ("reset", None) => ShellCommand::Reset(ResetScope::Both),
        ("reset", Some(scope)) => match crate::parse_scope(scope) {
            Ok(scope) => ShellCommand::Reset(scope),
            Err(e) => ShellCommand::Invalid(e),
        },
        (other, _) => ShellCommand::Invalid(format!("unknown command `/{other}` (try /help)")),
    }
}

/// Runs the `stoa shell` interactive REPL, starting with `persona`.
pub async fn run_shell(config: StoaConfig, persona: String) -> Result<(), StoaError> {
    let provider = AnthropicProvider::new(&config.anthropic).inspect_err(|_| {
        eprintln!(
            "error: Anthropic API key required. Set anthropic.api_key in config or the ANTHROPIC_API_KEY env var"
        );
    })?;
    let runtime = AgentRuntime::open(&config, Arc::new(provider)).await?;
    runtime.registry().get(&persona)?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| StoaError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "stoa shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let mut current = persona;
    loop {
        let prompt = format!("{}> ", current.green());
        match rl.readline(&prompt) {
            Ok(line) => {
                let command = parse_line(&line);
                if command != ShellCommand::Empty {
                    let _ = rl.add_history_entry(&line);
                }
                match command {
                    ShellCommand::Quit => break,
                    ShellCommand::Empty => {}
                    ShellCommand::Help => print_help(),
                    ShellCommand::Personas => {
                        for p in runtime.personas() {
                            let marker = if p.id == current { "*" } else { " " };
                            println!("{marker} {:<14} {}", p.id.bold(), p.name);
                        }
                    }
                    ShellCommand::Switch(id) => match runtime.registry().get(&id) {
                        Ok(p) => {
                            println!("{}", format!("now talking to {}", p.name).dimmed());
                            current = id;
                        }
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                    ShellCommand::Reset(scope) => match runtime.reset(&current, scope).await {
                        Ok(report) => println!("{}", describe(&report)),
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                    ShellCommand::Count => match runtime.count(&current).await {
                        Ok(n) => println!("{}", format!("{n} long-term entries").dimmed()),
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                    ShellCommand::Invalid(message) => eprintln!("{}", message.yellow()),
                    ShellCommand::Message(text) => match runtime.respond(&current, &text).await {
                        Ok(reply) => println!("{reply}\n"),
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    },
                }
            }
            // Ctrl+C / Ctrl+D
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    runtime.shutdown().await;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

fn print_help() {
    println!("  /persona <id>   switch persona");
    println!("  /personas       list personas");
    println!("  /reset [scope]  clear memory (short_term, long_term, both)");
    println!("  /count          long-term entries of the current persona");
    println!("  /quit           leave the shell");
}
