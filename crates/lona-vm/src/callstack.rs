// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Error reporting: turns a `LonaError` into the multi-line excerpt-plus-
//! message text a REPL or CLI prints (§4.8). Full call-stack reconstruction
//! (per-frame source locations) is deferred until the evaluator threads a
//! frame list through calls; today this formats the error itself plus, for
//! read/eval errors with a known position, the offending source line.

use crate::error::LonaError;

/// Render `error` the way the REPL and CLI report an uncaught failure:
/// `<kind>: <message>`, with a second line quoting the source excerpt when
/// the error carries a known line.
#[must_use]
pub fn format_error(error: &LonaError, source: Option<&str>) -> String {
    let mut out = format!("{}: {error}", error.kind());
    if let LonaError::Read { line, .. } = error {
        if *line > 0 {
            if let Some(src) = source {
                if let Some(text) = src.lines().nth((*line - 1) as usize) {
                    out.push('\n');
                    out.push_str("  ");
                    out.push_str(text.trim_end());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod callstack_test {
    use super::*;
    use crate::error::LonaError;

    #[test]
    fn formats_a_plain_error() {
        let err = LonaError::unbound("foo");
        assert_eq!(format_error(&err, None), "UnboundSymbol: unbound symbol: foo");
    }

    #[test]
    fn formats_a_read_error_with_excerpt() {
        let err = LonaError::read("unexpected eof", None, 2, 0);
        let src = "(foo\n(bar";
        let formatted = format_error(&err, Some(src));
        assert!(formatted.contains("(bar"));
    }
}
