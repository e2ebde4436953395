// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Command-line entry point for the Lona VM.
//!
//! With no arguments, starts an interactive REPL. Given a script path, loads
//! and evaluates it, printing a formatted error and exiting non-zero on
//! failure instead of dropping into the REPL.

use clap::Parser;
use lona_vm::Vm;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lona", version = lona_vm::VERSION, about = "The Lona Lisp VM")]
struct Cli {
    /// Script to load and evaluate. Omit to start an interactive REPL.
    script: Option<PathBuf>,

    /// Drop into the REPL after the script finishes, keeping the VM's state.
    #[arg(short, long)]
    interactive: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut vm = Vm::new();

    let Some(path) = cli.script else {
        return match lona_vm::repl::run(&mut vm) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("lona: {e}");
                ExitCode::FAILURE
            }
        };
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("lona: cannot read {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let path_str = path.display().to_string();
    let mut failed = false;
    if let Err(e) = vm.load_str(&path_str, &source) {
        eprintln!("{}", lona_vm::callstack::format_error(&e, Some(&source)));
        failed = true;
    }

    if cli.interactive {
        if let Err(e) = lona_vm::repl::run(&mut vm) {
            eprintln!("lona: {e}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
