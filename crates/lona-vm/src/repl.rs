// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The read-eval-print loop: one top-level form per input line, errors
//! reported and swallowed rather than ending the session (§4.8's "drop into
//! a nested REPL on error" behavior simplifies here to "report and keep
//! going", since there is no enclosing non-interactive caller to resume).

use crate::vm::Vm;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Run an interactive REPL against stdin/stdout until EOF.
///
/// # Errors
/// Returns `Err` only for an underlying I/O failure reading stdin; errors
/// raised by evaluated code are caught, printed, and do not end the loop.
pub fn run(vm: &mut Vm) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut counter: u64 = 0;

    loop {
        counter += 1;
        write!(stdout, "lona[{counter}]> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match vm.load_str("<repl>", trimmed) {
            Ok(value) => match vm.stringify(value) {
                Ok(text) => writeln!(stdout, "{text}")?,
                Err(e) => writeln!(stdout, "print error: {e}")?,
            },
            Err(e) => {
                warn!(error = %e, "repl form failed");
                writeln!(stdout, "{}", crate::callstack::format_error(&e, Some(trimmed)))?;
            }
        }
    }
    Ok(())
}
