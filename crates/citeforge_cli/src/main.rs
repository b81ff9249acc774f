//! `citeforge` command-line entry point.
//!
//! # Responsibility
//! - Load settings, start logging and dispatch one subcommand.
//! - Map failures to a non-zero exit code with a one-line message.

mod cli;
mod commands;

use citeforge_core::{default_log_level, init_logging, LogTarget, Settings};
use clap::Parser;
use cli::Cli;
use std::process;

fn main() {
    let cli = Cli::parse();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let (level, target) = match &settings.log_dir {
        Some(dir) => (
            settings
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string()),
            LogTarget::Directory(dir.clone()),
        ),
        None => (
            settings.log_level.clone().unwrap_or_else(|| "warn".to_string()),
            LogTarget::Stderr,
        ),
    };
    if let Err(err) = init_logging(&level, target) {
        eprintln!("warning: logging disabled: {err}");
    }

    match commands::execute(cli.command, &settings) {
        Ok(code) => process::exit(code),
        Err(err) => {
            log::error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
